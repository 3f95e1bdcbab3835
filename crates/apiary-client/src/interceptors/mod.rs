//! Request/response interceptors and dynamic header providers

use std::future::Future;
use std::sync::Arc;

use apiary_core::error::{ApiaryError, ApiaryResult};
use futures::future::BoxFuture;
use serde_json::Value;

use crate::api::OutgoingRequest;

/// Inspects or mutates an outgoing request; `Some(value)` short-circuits the
/// network call and becomes the final result.
pub type RequestInterceptor = Arc<dyn Fn(&mut OutgoingRequest) -> Option<Value> + Send + Sync>;

/// Transforms a parsed response payload
pub type ResponseInterceptor = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Observes an error before it is returned
pub type ErrorInterceptor = Arc<dyn Fn(&ApiaryError) + Send + Sync>;

/// Runs after every call
pub type FinallyInterceptor = Arc<dyn Fn() + Send + Sync>;

/// Produces headers asynchronously before each request
pub type DynamicHeaders =
    Arc<dyn Fn() -> BoxFuture<'static, ApiaryResult<Vec<(String, String)>>> + Send + Sync>;

/// Config-level interceptor hooks
#[derive(Clone, Default)]
pub struct Interceptors {
    pub on_request: Option<RequestInterceptor>,
    pub on_response: Option<ResponseInterceptor>,
    pub on_error: Option<ErrorInterceptor>,
    pub on_finally: Option<FinallyInterceptor>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut OutgoingRequest) -> Option<Value> + Send + Sync + 'static,
    {
        self.on_request = Some(Arc::new(f));
        self
    }

    pub fn on_response<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ApiaryError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_finally<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_finally = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptors")
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_finally", &self.on_finally.is_some())
            .finish()
    }
}

/// Wrap an async closure as a `DynamicHeaders` provider
pub fn dynamic_headers<F, Fut>(provider: F) -> DynamicHeaders
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiaryResult<Vec<(String, String)>>> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<'static, ApiaryResult<Vec<(String, String)>>> {
        Box::pin(provider())
    })
}
