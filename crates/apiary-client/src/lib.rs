//! HTTP client core and client registry for Apiary
//!
//! This crate turns a logical request descriptor (`"post:users"` plus
//! parameters) into exactly one network call. It layers headers, runs the
//! interceptor pipeline, normalizes failures into `ApiaryError` and supports
//! cooperative cancellation through a per-client abort controller.
//!
//! `ClientRegistry` keeps named clients with one optional default and
//! implements the same `ApiClient` interface by delegating to that default.

pub mod abort;
pub mod api;
pub mod client;
pub mod headers;
pub mod interceptors;
pub mod registry;
pub mod transport;

// Re-export main types
pub use abort::{AbortController, AbortSignal};
pub use api::{ApiClient, FormData, FormPart, OutgoingRequest, Payload, RequestDescriptor, RequestOptions};
pub use client::{ClientConfig, HttpClient};
pub use headers::HeaderSet;
pub use interceptors::Interceptors;
pub use registry::ClientRegistry;
pub use transport::{ReqwestTransport, Transport, TransportBody, TransportRequest, TransportResponse};
#[cfg(any(test, feature = "test-util"))]
pub use transport::MockTransport;

use apiary_core::error::ApiaryError;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ApiaryError>;
