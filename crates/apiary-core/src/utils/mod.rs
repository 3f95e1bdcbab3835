//! Utility functions and helpers.
//!
//! Common functionality used across multiple Apiary crates.

pub mod json;
pub mod url;

// Re-export commonly used utilities
pub use self::json::parse_lenient;
pub use self::url::{append_query, join_url};
