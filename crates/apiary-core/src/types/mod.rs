//! Core data types for Apiary.

pub mod method;
pub mod params;

pub use method::{parse_target, HttpMethod, RequestTarget};
pub use params::{merge_params, param_to_string, Params};
