//! Request-state hook.
//!
//! `ApiHook` ties repeated calls of one endpoint to the lifecycle of a UI
//! component. It owns the params, the loading flags and the last payload
//! (or a path in a shared `DataStore`), and re-runs the request on mount,
//! on focus, on params changes and on dependency changes.
//!
//! Every trigger goes through `send`, which runs these steps in order:
//!
//! 1. reject the trigger if another one is in flight (a paginated hook may
//!    load more while a refresh runs);
//! 2. set the loading flag for the mode and clear the previous error;
//! 3. merge the params with the per-call overrides and, when loading more,
//!    the next page number;
//! 4. apply `filter_params` and `validate_params`;
//! 5. await `on_submit` (and `on_refresh` for refreshes), then the request;
//! 6. drop the result if the hook was unmounted or the request aborted;
//! 7. store the filtered (and page-merged) payload and await `on_success`,
//!    or record the error and await `on_error`;
//! 8. clear the flag of the mode and await `on_completed`.
//!
//! Errors never escape `send`; they are reported through the state and the
//! `on_error` callback.

mod options;
mod state;

pub use self::options::{
    CompletedCallback, ErrorCallback, FocusPolicy, HookOptions, ParamsChangePolicy, ParamsFilter,
    ParamsValidator, RefreshCallback, ResponseFilter, SubmitCallback, SuccessCallback,
    DEFAULT_DEBOUNCE,
};
pub use self::state::{FetchMode, RequestState, TriggerOutcome};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use apiary_client::{ApiClient, ClientRegistry, RequestOptions};
use apiary_core::error::ApiaryResult;
use apiary_core::types::{merge_params, parse_target, Params};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::pagination;
use crate::store::DataStore;

/// Where the payload of a hook lives
enum ResponseSlot {
    Local(watch::Sender<Option<Value>>),
    Store { store: Arc<dyn DataStore>, path: String },
}

impl ResponseSlot {
    fn get(&self) -> Option<Value> {
        match self {
            ResponseSlot::Local(slot) => slot.borrow().clone(),
            ResponseSlot::Store { store, path } => store.get(path),
        }
    }

    fn set(&self, value: Value) {
        match self {
            ResponseSlot::Local(slot) => {
                slot.send_replace(Some(value));
            },
            ResponseSlot::Store { store, path } => store.update(path, value),
        }
    }

    fn watch(&self) -> watch::Receiver<Option<Value>> {
        match self {
            ResponseSlot::Local(slot) => slot.subscribe(),
            ResponseSlot::Store { store, path } => store.watch(path),
        }
    }

    /// Whether a shared store already holds a payload
    fn has_shared_data(&self) -> bool {
        match self {
            ResponseSlot::Local(_) => false,
            ResponseSlot::Store { store, path } => store.get(path).map_or(false, |v| !v.is_null()),
        }
    }
}

#[derive(Default)]
struct Lifecycle {
    mounted: bool,
    last_success: Option<Instant>,
    refresh_dependencies: Option<Vec<Value>>,
    controlled_params: Option<Params>,
    debounce: Option<JoinHandle<()>>,
}

struct HookInner {
    client: Arc<dyn ApiClient>,
    options: HookOptions,
    state: watch::Sender<RequestState>,
    /// Set while an initial or refresh trigger runs, even when no public
    /// loading flag is raised for it
    primary_in_flight: AtomicBool,
    slot: ResponseSlot,
    lifecycle: Mutex<Lifecycle>,
}

/// Handle to one hook instance; clones share the same state
#[derive(Clone)]
pub struct ApiHook {
    inner: Arc<HookInner>,
}

impl ApiHook {
    /// Create a mounted hook that issues its requests through `client`
    pub fn new(client: Arc<dyn ApiClient>, options: HookOptions) -> Self {
        let slot = match &options.store {
            Some(store) => ResponseSlot::Store {
                store: Arc::clone(store),
                path: options.data_path.clone().unwrap_or_else(|| options.uri.clone()),
            },
            None => {
                let seed = options.pagination.as_ref().map(|_| pagination::empty_page());
                ResponseSlot::Local(watch::channel(seed).0)
            },
        };

        let initial = RequestState {
            params: options.initial_params.clone(),
            response: slot.get(),
            ..RequestState::default()
        };

        Self {
            inner: Arc::new(HookInner {
                client,
                options,
                state: watch::channel(initial).0,
                primary_in_flight: AtomicBool::new(false),
                slot,
                lifecycle: Mutex::new(Lifecycle {
                    mounted: true,
                    ..Lifecycle::default()
                }),
            }),
        }
    }

    /// Create a hook over a registered client, or the default client
    pub fn from_registry(registry: &ClientRegistry, name: Option<&str>, options: HookOptions) -> ApiaryResult<Self> {
        let client: Arc<dyn ApiClient> = registry.use_client(name)?;
        Ok(Self::new(client, options))
    }

    pub fn options(&self) -> &HookOptions {
        &self.inner.options
    }

    pub fn client(&self) -> &Arc<dyn ApiClient> {
        &self.inner.client
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RequestState {
        let mut state = self.inner.state.borrow().clone();
        state.response = self.inner.slot.get();
        state
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.inner.state.subscribe()
    }

    /// Receiver notified on every payload change, including store writes
    /// made by others
    pub fn watch_response(&self) -> watch::Receiver<Option<Value>> {
        self.inner.slot.watch()
    }

    pub fn params(&self) -> Params {
        self.inner.state.borrow().params.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.lifecycle.lock().mounted
    }

    /// Whether the last page reported more pages; always false without pagination
    pub fn has_more(&self) -> bool {
        match &self.inner.options.pagination {
            Some(policy) => {
                let stored = self.inner.slot.get();
                policy.has_more(&pagination::stored_metadata(stored.as_ref()))
            },
            None => false,
        }
    }

    /// Run one trigger to completion
    pub async fn send(&self, mode: FetchMode, overrides: Option<Params>) -> TriggerOutcome {
        let options = &self.inner.options;
        let paginated = options.pagination.is_some();

        let mut base = None;
        self.inner.state.send_if_modified(|state| {
            let primary_busy = self.inner.primary_in_flight.load(Ordering::SeqCst);
            let rejected = match mode {
                FetchMode::Pagination => state.is_loading_more || (primary_busy && !paginated),
                FetchMode::Initial | FetchMode::Refresh => primary_busy || state.is_loading_more,
            };
            if rejected {
                return false;
            }

            match mode {
                FetchMode::Initial => state.is_initial_loading = !state.has_fetched_once,
                FetchMode::Refresh => state.is_refreshing = true,
                FetchMode::Pagination => state.is_loading_more = true,
            }
            if mode != FetchMode::Pagination {
                self.inner.primary_in_flight.store(true, Ordering::SeqCst);
            }
            state.error = None;
            base = Some(state.params.clone());
            true
        });

        let Some(base) = base else {
            debug!("{:?} trigger for '{}' rejected: request in flight", mode, options.uri);
            return TriggerOutcome::Rejected;
        };

        let mut params = match &overrides {
            Some(overrides) => merge_params(&base, overrides),
            None => base,
        };

        if mode == FetchMode::Pagination {
            if let Some(policy) = &options.pagination {
                let stored = self.inner.slot.get();
                let next = policy.page(&pagination::stored_metadata(stored.as_ref())) + 1;
                params.insert(policy.page_key().to_string(), Value::from(next));
            }
        }

        if let Some(filter) = &options.filter_params {
            params = filter(params);
        }

        if let Some(validate) = &options.validate_params {
            if !validate(&params) {
                debug!("Params for '{}' failed validation, skipping request", options.uri);
                self.finish(mode);
                return TriggerOutcome::Invalid;
            }
        }

        let requested_page = options
            .pagination
            .as_ref()
            .map_or(1, |policy| page_param(&params, policy.page_key()));

        if let Some(on_submit) = &options.on_submit {
            on_submit(params.clone()).await;
        }
        if mode == FetchMode::Refresh {
            if let Some(on_refresh) = &options.on_refresh {
                on_refresh().await;
            }
        }

        debug!("{:?} trigger for '{}'", mode, options.uri);
        let result = self
            .inner
            .client
            .request(&options.uri, self.request_options(&params))
            .await;

        if !self.is_mounted() {
            debug!("Discarding response for '{}': hook unmounted", options.uri);
            self.finish(mode);
            return TriggerOutcome::Discarded;
        }

        let outcome = match result {
            Ok(Some(data)) => {
                let data = match &options.filter_response {
                    Some(filter) => filter(data),
                    None => data,
                };
                self.store_success(&data, requested_page);

                if let Some(on_success) = &options.on_success {
                    on_success(data, params).await;
                }
                TriggerOutcome::Completed
            },
            Ok(None) => {
                debug!("Request for '{}' aborted", options.uri);
                TriggerOutcome::Aborted
            },
            Err(error) if error.is_aborted() => {
                debug!("Request for '{}' aborted", options.uri);
                TriggerOutcome::Aborted
            },
            Err(error) => {
                warn!("Request for '{}' failed: {}", options.uri, error);
                let error = Arc::new(error);
                self.inner.state.send_modify(|state| state.error = Some(Arc::clone(&error)));

                if let Some(on_error) = &options.on_error {
                    on_error(Arc::clone(&error)).await;
                }
                TriggerOutcome::Failed(error)
            },
        };

        self.finish(mode);
        if let Some(on_completed) = &options.on_completed {
            on_completed().await;
        }

        outcome
    }

    pub async fn refresh(&self) -> TriggerOutcome {
        self.send(FetchMode::Refresh, None).await
    }

    /// Fetch the next page when the last page reported more
    pub async fn load_more(&self) -> TriggerOutcome {
        if !self.has_more() {
            return TriggerOutcome::Skipped;
        }
        self.send(FetchMode::Pagination, None).await
    }

    /// Replace the params
    pub fn set_params(&self, params: Params) {
        let changed = self.inner.state.send_if_modified(|state| {
            if state.params == params {
                return false;
            }
            state.params = params;
            true
        });

        if changed {
            self.params_changed();
        }
    }

    /// Shallow-merge `partial` into the params
    pub fn update_params(&self, partial: Params) {
        let changed = self.inner.state.send_if_modified(|state| {
            let merged = merge_params(&state.params, &partial);
            if merged == state.params {
                return false;
            }
            state.params = merged;
            true
        });

        if changed {
            self.params_changed();
        }
    }

    /// Setter bound to a single param key, for form-field binding
    pub fn handle_on_change(&self, key: impl Into<String>) -> impl Fn(Value) + Send + Sync + 'static {
        let hook = self.clone();
        let key = key.into();
        move |value| {
            let mut partial = Params::new();
            partial.insert(key.clone(), value);
            hook.update_params(partial);
        }
    }

    /// Follow externally controlled params; only a change by value resyncs
    pub fn sync_controlled_params(&self, params: Params) {
        let changed = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if lifecycle.controlled_params.as_ref() == Some(&params) {
                false
            } else {
                lifecycle.controlled_params = Some(params.clone());
                true
            }
        };

        if changed {
            self.set_params(params);
        }
    }

    /// Refresh when the dependency list changes after the first fetch
    pub async fn set_refresh_dependencies(&self, dependencies: Vec<Value>) -> TriggerOutcome {
        let previous = self
            .inner
            .lifecycle
            .lock()
            .refresh_dependencies
            .replace(dependencies.clone());

        let changed = previous.map_or(false, |previous| previous != dependencies);
        let fetched = self.inner.state.borrow().has_fetched_once;
        if changed && fetched {
            self.refresh().await
        } else {
            TriggerOutcome::Skipped
        }
    }

    /// Attach to a component and run the mount trigger if configured
    pub async fn mount(&self) -> TriggerOutcome {
        self.inner.lifecycle.lock().mounted = true;

        let options = &self.inner.options;
        if !(options.run_on_mount || options.always_run_on_mount) {
            return TriggerOutcome::Skipped;
        }

        let fetched = self.inner.state.borrow().has_fetched_once;
        if (fetched || self.inner.slot.has_shared_data()) && !options.always_run_on_mount {
            return TriggerOutcome::Skipped;
        }

        self.send(FetchMode::Initial, None).await
    }

    /// Detach from the component; later responses are discarded
    pub fn unmount(&self) {
        let pending = {
            let mut lifecycle = self.inner.lifecycle.lock();
            lifecycle.mounted = false;
            lifecycle.debounce.take()
        };

        if let Some(timer) = pending {
            timer.abort();
        }

        if self.inner.options.abort_on_unmount {
            self.abort_client();
        }
    }

    /// Regained focus; refresh according to the focus policy
    pub async fn focus(&self) -> TriggerOutcome {
        let fetched = self.inner.state.borrow().has_fetched_once;
        let should_refresh = match self.inner.options.run_on_focus {
            FocusPolicy::Never => false,
            FocusPolicy::Always => true,
            FocusPolicy::Once => !fetched,
            FocusPolicy::StaleAfter(window) => self
                .inner
                .lifecycle
                .lock()
                .last_success
                .map_or(true, |at| at.elapsed() > window),
        };

        if should_refresh {
            self.refresh().await
        } else {
            TriggerOutcome::Skipped
        }
    }

    /// Lost focus; abort in-flight requests if configured
    pub fn blur(&self) {
        if self.inner.options.abort_on_blur {
            self.abort_client();
        }
    }

    /// Release the in-flight marker and loading flag owned by `mode`
    fn finish(&self, mode: FetchMode) {
        self.inner.state.send_modify(|state| {
            state.clear_flag(mode);
            if mode != FetchMode::Pagination {
                self.inner.primary_in_flight.store(false, Ordering::SeqCst);
            }
        });
    }

    fn abort_client(&self) {
        if let Err(e) = self.inner.client.abort() {
            warn!("Failed to abort requests for '{}': {}", self.inner.options.uri, e);
        }
    }

    fn request_options(&self, params: &Params) -> RequestOptions {
        let options = &self.inner.options;
        let method = parse_target(&options.uri, Some(options.method)).method;

        let request = RequestOptions::new().method(method);
        if method.uses_query() {
            request.query(params.clone())
        } else {
            request.json(Value::Object(params.clone()))
        }
    }

    fn store_success(&self, data: &Value, requested_page: u64) {
        let stored = match &self.inner.options.pagination {
            Some(policy) => {
                let existing = pagination::stored_results(self.inner.slot.get().as_ref());
                let merged = policy.merge(existing, policy.results(data), requested_page);
                pagination::paged_value(merged, policy.metadata(data))
            },
            None => data.clone(),
        };

        self.inner.slot.set(stored.clone());
        self.inner.lifecycle.lock().last_success = Some(Instant::now());
        self.inner.state.send_modify(|state| {
            state.response = Some(stored);
            state.has_fetched_once = true;
            state.last_fetch_timestamp = Some(Utc::now());
        });
    }

    fn params_changed(&self) {
        let fetched = self.inner.state.borrow().has_fetched_once;
        if !fetched {
            return;
        }

        let delay = match self.inner.options.run_on_params_change {
            ParamsChangePolicy::Never => return,
            ParamsChangePolicy::Immediate => None,
            ParamsChangePolicy::Debounce(window) => Some(window),
        };

        let Ok(runtime) = Handle::try_current() else {
            warn!(
                "No async runtime available, skipping params-change refresh for '{}'",
                self.inner.options.uri
            );
            return;
        };

        let hook = self.clone();
        match delay {
            None => {
                runtime.spawn(async move {
                    hook.refresh().await;
                });
            },
            Some(window) => {
                let timer = runtime.spawn(async move {
                    tokio::time::sleep(window).await;
                    // Detach so superseding the timer never cancels a running refresh
                    tokio::spawn(async move {
                        hook.refresh().await;
                    });
                });

                let previous = self.inner.lifecycle.lock().debounce.replace(timer);
                if let Some(previous) = previous {
                    previous.abort();
                }
            },
        }
    }
}

impl std::fmt::Debug for ApiHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiHook")
            .field("options", &self.inner.options)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

/// Page number carried in the params, `1` when absent
fn page_param(params: &Params, key: &str) -> u64 {
    match params.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(1),
        Some(Value::String(s)) => s.parse().unwrap_or(1),
        _ => 1,
    }
}
