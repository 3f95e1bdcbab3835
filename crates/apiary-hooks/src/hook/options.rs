//! Hook configuration and callback types

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use apiary_core::error::ApiaryError;
use apiary_core::types::{HttpMethod, Params};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::pagination::PaginationPolicy;
use crate::store::DataStore;

/// Debounce window used for `ParamsChangePolicy::debounced()`
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub type SubmitCallback = Arc<dyn Fn(Params) -> BoxFuture<'static, ()> + Send + Sync>;
pub type RefreshCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;
pub type SuccessCallback = Arc<dyn Fn(Value, Params) -> BoxFuture<'static, ()> + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(Arc<ApiaryError>) -> BoxFuture<'static, ()> + Send + Sync>;
pub type CompletedCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub type ParamsValidator = Arc<dyn Fn(&Params) -> bool + Send + Sync>;
pub type ParamsFilter = Arc<dyn Fn(Params) -> Params + Send + Sync>;
pub type ResponseFilter = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// When regaining focus triggers a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusPolicy {
    #[default]
    Never,
    Always,
    /// Only while nothing has been fetched yet
    Once,
    /// Only when the last success is older than the window
    StaleAfter(Duration),
}

/// How a change of params schedules a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamsChangePolicy {
    #[default]
    Never,
    Immediate,
    Debounce(Duration),
}

impl ParamsChangePolicy {
    /// Debounce with `DEFAULT_DEBOUNCE`
    pub fn debounced() -> Self {
        ParamsChangePolicy::Debounce(DEFAULT_DEBOUNCE)
    }
}

/// Configuration of an `ApiHook`
#[derive(Clone)]
pub struct HookOptions {
    /// Endpoint, optionally prefixed with `"<METHOD>:"`
    pub uri: String,
    /// Method used when `uri` has no prefix
    pub method: HttpMethod,
    pub initial_params: Params,
    pub run_on_mount: bool,
    /// Fetch on mount even when data is already present
    pub always_run_on_mount: bool,
    pub run_on_focus: FocusPolicy,
    pub run_on_params_change: ParamsChangePolicy,
    pub abort_on_unmount: bool,
    pub abort_on_blur: bool,
    pub validate_params: Option<ParamsValidator>,
    pub filter_params: Option<ParamsFilter>,
    pub filter_response: Option<ResponseFilter>,
    pub on_submit: Option<SubmitCallback>,
    pub on_refresh: Option<RefreshCallback>,
    pub on_success: Option<SuccessCallback>,
    pub on_error: Option<ErrorCallback>,
    pub on_completed: Option<CompletedCallback>,
    pub pagination: Option<Arc<dyn PaginationPolicy>>,
    pub store: Option<Arc<dyn DataStore>>,
    /// Path of the payload inside `store`; defaults to `uri`
    pub data_path: Option<String>,
}

impl HookOptions {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            method: HttpMethod::Post,
            initial_params: Params::new(),
            run_on_mount: false,
            always_run_on_mount: false,
            run_on_focus: FocusPolicy::Never,
            run_on_params_change: ParamsChangePolicy::Never,
            abort_on_unmount: true,
            abort_on_blur: false,
            validate_params: None,
            filter_params: None,
            filter_response: None,
            on_submit: None,
            on_refresh: None,
            on_success: None,
            on_error: None,
            on_completed: None,
            pagination: None,
            store: None,
            data_path: None,
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn initial_params(mut self, params: Params) -> Self {
        self.initial_params = params;
        self
    }

    pub fn run_on_mount(mut self, enabled: bool) -> Self {
        self.run_on_mount = enabled;
        self
    }

    pub fn always_run_on_mount(mut self, enabled: bool) -> Self {
        self.always_run_on_mount = enabled;
        self
    }

    pub fn run_on_focus(mut self, policy: FocusPolicy) -> Self {
        self.run_on_focus = policy;
        self
    }

    pub fn run_on_params_change(mut self, policy: ParamsChangePolicy) -> Self {
        self.run_on_params_change = policy;
        self
    }

    pub fn abort_on_unmount(mut self, enabled: bool) -> Self {
        self.abort_on_unmount = enabled;
        self
    }

    pub fn abort_on_blur(mut self, enabled: bool) -> Self {
        self.abort_on_blur = enabled;
        self
    }

    pub fn validate_params<F>(mut self, f: F) -> Self
    where
        F: Fn(&Params) -> bool + Send + Sync + 'static,
    {
        self.validate_params = Some(Arc::new(f));
        self
    }

    pub fn filter_params<F>(mut self, f: F) -> Self
    where
        F: Fn(Params) -> Params + Send + Sync + 'static,
    {
        self.filter_params = Some(Arc::new(f));
        self
    }

    pub fn filter_response<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.filter_response = Some(Arc::new(f));
        self
    }

    pub fn on_submit<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_submit = Some(Arc::new(move |params| f(params).boxed()));
        self
    }

    pub fn on_refresh<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_refresh = Some(Arc::new(move || f().boxed()));
        self
    }

    pub fn on_success<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_success = Some(Arc::new(move |data, params| f(data, params).boxed()));
        self
    }

    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<ApiaryError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |error| f(error).boxed()));
        self
    }

    pub fn on_completed<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_completed = Some(Arc::new(move || f().boxed()));
        self
    }

    pub fn pagination(mut self, policy: impl PaginationPolicy + 'static) -> Self {
        self.pagination = Some(Arc::new(policy));
        self
    }

    /// Keep the payload in `store` at `path` instead of a private slot
    pub fn store(mut self, store: Arc<dyn DataStore>, path: impl Into<String>) -> Self {
        self.store = Some(store);
        self.data_path = Some(path.into());
        self
    }
}

impl std::fmt::Debug for HookOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookOptions")
            .field("uri", &self.uri)
            .field("method", &self.method)
            .field("initial_params", &self.initial_params)
            .field("run_on_mount", &self.run_on_mount)
            .field("always_run_on_mount", &self.always_run_on_mount)
            .field("run_on_focus", &self.run_on_focus)
            .field("run_on_params_change", &self.run_on_params_change)
            .field("abort_on_unmount", &self.abort_on_unmount)
            .field("abort_on_blur", &self.abort_on_blur)
            .field("pagination", &self.pagination.is_some())
            .field("store", &self.store.is_some())
            .field("data_path", &self.data_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = HookOptions::new("users");
        assert_eq!(options.method, HttpMethod::Post);
        assert!(options.abort_on_unmount);
        assert!(!options.abort_on_blur);
        assert!(!options.run_on_mount);
        assert_eq!(options.run_on_focus, FocusPolicy::Never);
        assert_eq!(options.run_on_params_change, ParamsChangePolicy::Never);
        assert!(options.pagination.is_none());
    }

    #[test]
    fn test_debounced_uses_default_window() {
        assert_eq!(
            ParamsChangePolicy::debounced(),
            ParamsChangePolicy::Debounce(Duration::from_millis(300))
        );
    }
}
