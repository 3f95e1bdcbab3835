//! Configuration parsing for Apiary
//!
//! This crate handles parsing and validation of `apiary.toml` files, which
//! declare the named backends an application talks to, and layers
//! environment overrides on top of them.

pub mod merge;
pub mod toml;

// Re-export main types
pub use self::merge::{ConfigLoader, CONFIG_FILE_NAME, ENV_PREFIX};
pub use self::toml::{ApiaryToml, ClientSettings};

use apiary_core::error::ApiaryError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ApiaryError>;
