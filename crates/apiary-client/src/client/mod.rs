//! HTTP client core: header layering, interceptor pipeline and cancellation

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use apiary_config::ClientSettings;
use apiary_core::error::{ApiaryError, ApiaryResult};
use apiary_core::types::{parse_target, RequestTarget};
use apiary_core::utils::{append_query, join_url, parse_lenient};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::abort::{AbortController, AbortSignal};
use crate::api::{ApiClient, OutgoingRequest, RequestOptions};
use crate::headers::{HeaderSet, CONTENT_TYPE};
use crate::interceptors::{self, DynamicHeaders, Interceptors};
use crate::transport::{ReqwestTransport, Transport, TransportResponse};

/// Per-backend configuration
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Static headers sent with every request
    pub headers: HeaderSet,
    /// Async header provider, evaluated once per request
    pub dynamic_headers: Option<DynamicHeaders>,
    pub interceptors: Interceptors,
    /// Resolve aborted requests to `Ok(None)` instead of `Err(Aborted)`
    pub return_null_on_abort: bool,
    /// Timeout for the default reqwest transport
    pub timeout: Option<Duration>,
    /// Custom transport; a `ReqwestTransport` is built when absent
    pub transport: Option<Arc<dyn Transport>>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: HeaderSet::new(),
            dynamic_headers: None,
            interceptors: Interceptors::default(),
            return_null_on_abort: true,
            timeout: None,
            transport: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn dynamic_headers<F, Fut>(mut self, provider: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiaryResult<Vec<(String, String)>>> + Send + 'static,
    {
        self.dynamic_headers = Some(interceptors::dynamic_headers(provider));
        self
    }

    pub fn interceptors(mut self, interceptors: Interceptors) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn return_null_on_abort(mut self, enabled: bool) -> Self {
        self.return_null_on_abort = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl From<&ClientSettings> for ClientConfig {
    fn from(settings: &ClientSettings) -> Self {
        let mut config = ClientConfig::new(settings.base_url.clone())
            .return_null_on_abort(settings.return_null_on_abort);
        config.headers.extend(
            settings
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        config.timeout = settings.timeout_secs.map(Duration::from_secs);
        config
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("dynamic_headers", &self.dynamic_headers.is_some())
            .field("interceptors", &self.interceptors)
            .field("return_null_on_abort", &self.return_null_on_abort)
            .field("timeout", &self.timeout)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

/// Client for one backend
pub struct HttpClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    /// Headers set at runtime through `set_header`
    runtime_headers: RwLock<HeaderSet>,
    abort: AbortController,
}

impl HttpClient {
    /// Create a client, building the default transport when none is configured
    pub fn new(config: ClientConfig) -> ApiaryResult<Self> {
        let transport: Arc<dyn Transport> = match &config.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(ReqwestTransport::with_timeout(config.timeout)?),
        };

        Ok(Self {
            config,
            transport,
            runtime_headers: RwLock::new(HeaderSet::new()),
            abort: AbortController::new(),
        })
    }

    /// Create a client from a declarative settings section
    pub fn from_settings(settings: &ClientSettings) -> ApiaryResult<Self> {
        Self::new(ClientConfig::from(settings))
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Snapshot of the runtime headers
    pub fn runtime_headers(&self) -> HeaderSet {
        self.runtime_headers.read().clone()
    }

    /// Signal that a request starting now would observe
    pub fn signal(&self) -> AbortSignal {
        self.abort.signal()
    }

    /// Generation of the current abort signal
    pub fn abort_generation(&self) -> u64 {
        self.abort.generation()
    }

    /// Resolve the target, URL and layered headers of a request
    async fn prepare(&self, target: &str, options: &mut RequestOptions) -> ApiaryResult<OutgoingRequest> {
        let RequestTarget { method, endpoint } = parse_target(target, options.method);

        let mut url = join_url(&self.config.base_url, &endpoint);
        if let Some(query) = &options.query {
            url = append_query(&url, query);
        }

        let body = options.body.take();
        let is_form = body.as_ref().map_or(false, |b| b.is_form());

        let mut headers = self.config.headers.clone();
        if !is_form {
            headers.insert(CONTENT_TYPE, "application/json");
        }
        if let Some(provider) = &self.config.dynamic_headers {
            headers.extend(provider().await?);
        }
        headers.merge(&self.runtime_headers.read());
        headers.merge(&options.headers);
        if is_form {
            headers.remove(CONTENT_TYPE);
        }

        Ok(OutgoingRequest {
            method,
            url,
            headers,
            body,
        })
    }

    async fn execute(
        &self,
        target: &str,
        mut options: RequestOptions,
        signal: &AbortSignal,
    ) -> ApiaryResult<Option<Value>> {
        let mut outgoing = tokio::select! {
            biased;
            _ = signal.aborted() => return Err(ApiaryError::Aborted),
            prepared = self.prepare(target, &mut options) => prepared?,
        };

        for interceptor in [&self.config.interceptors.on_request, &options.on_request]
            .into_iter()
            .flatten()
        {
            if let Some(value) = interceptor(&mut outgoing) {
                debug!("Request to {} answered by on_request interceptor", outgoing.url);
                return Ok(Some(value));
            }
        }

        let request = outgoing.into_transport()?;
        debug!("{} {}", request.method, request.url);

        let TransportResponse { status, body } = tokio::select! {
            biased;
            _ = signal.aborted() => return Err(ApiaryError::Aborted),
            response = self.transport.fetch(request) => response?,
        };

        let data = match parse_lenient(&body) {
            Ok(data) => data,
            Err(source) => return Err(ApiaryError::InvalidJson { status, body, source }),
        };

        if !(200..300).contains(&status) {
            return Err(ApiaryError::from_status(status, data));
        }

        let data = [&self.config.interceptors.on_response, &options.on_response]
            .into_iter()
            .flatten()
            .fold(data, |data, interceptor| interceptor(data));

        Ok(Some(data))
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("runtime_headers", &*self.runtime_headers.read())
            .field("abort_generation", &self.abort.generation())
            .finish()
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn request(&self, target: &str, options: RequestOptions) -> ApiaryResult<Option<Value>> {
        let signal = self.abort.signal();

        let outcome = match self.execute(target, options, &signal).await {
            Err(ApiaryError::Aborted) if self.config.return_null_on_abort => {
                debug!(
                    "Request to '{}' aborted (generation {}), resolving to null",
                    target,
                    signal.generation()
                );
                Ok(None)
            },
            Err(error) => {
                debug!("Request to '{}' failed: {}", target, error);
                if let Some(on_error) = &self.config.interceptors.on_error {
                    on_error(&error);
                }
                Err(error)
            },
            ok => ok,
        };

        if let Some(on_finally) = &self.config.interceptors.on_finally {
            on_finally();
        }

        outcome
    }

    fn abort(&self) -> ApiaryResult<()> {
        let generation = self.abort.abort();
        debug!("Aborted requests on {}, now at generation {}", self.config.base_url, generation);
        Ok(())
    }

    fn set_header(&self, name: &str, value: &str) -> ApiaryResult<()> {
        self.runtime_headers.write().insert(name, value);
        Ok(())
    }

    fn unset_header(&self, name: &str) -> ApiaryResult<()> {
        self.runtime_headers.write().remove(name);
        Ok(())
    }

    fn clear_headers(&self) -> ApiaryResult<()> {
        self.runtime_headers.write().clear();
        Ok(())
    }
}
