//! # apiary-core
//!
//! Core types and utilities shared across all Apiary crates.
//!
//! This crate provides:
//! - `ApiaryError` enum for unified error handling
//! - `HttpMethod` and request-target parsing (`"post:users"`)
//! - URL joining and query-string encoding
//! - Lenient JSON extraction for noisy response bodies
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (HttpMethod, RequestTarget, Params)
//! - `error`: Error types and result aliases
//! - `utils`: URL and JSON helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{ApiaryError, ApiaryResult};
pub use types::{merge_params, parse_target, HttpMethod, Params, RequestTarget};
pub use utils::{append_query, join_url, parse_lenient};
