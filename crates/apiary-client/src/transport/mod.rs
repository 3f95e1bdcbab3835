//! Transport boundary between the client pipeline and the network.
//!
//! The pipeline hands a fully encoded `TransportRequest` to a `Transport`
//! and gets back the status and raw body text. Cancellation is handled by the
//! caller, so transports only need to perform the round-trip.

pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use self::http::ReqwestTransport;
#[cfg(any(test, feature = "test-util"))]
pub use self::mock::MockTransport;

use apiary_core::error::ApiaryResult;
use apiary_core::types::HttpMethod;
use async_trait::async_trait;

use crate::api::FormData;

/// Encoded request body
#[derive(Debug, Clone, PartialEq)]
pub enum TransportBody {
    /// JSON text
    Text(String),
    /// Multipart form; the transport sets the boundary header
    Multipart(FormData),
}

/// A request ready to go on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<TransportBody>,
}

impl TransportRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body text, if the body is JSON
    pub fn text_body(&self) -> Option<&str> {
        match &self.body {
            Some(TransportBody::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Status and raw text of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one HTTP round-trip
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and read the full body as text.
    ///
    /// Failures to obtain a response are reported as `ApiaryError::Network`.
    async fn fetch(&self, request: TransportRequest) -> ApiaryResult<TransportResponse>;
}
