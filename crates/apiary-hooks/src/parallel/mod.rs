//! Parallel request helper.
//!
//! Runs a batch of request descriptors through `ApiClient::all` and exposes
//! the loading state, the error and the positional results. A batch equal
//! by value to the previous one is not re-issued; a changed batch aborts
//! the client first so stale responses resolve to nothing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use apiary_client::{ApiClient, RequestDescriptor};
use apiary_core::error::ApiaryError;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Observable state of a parallel batch
#[derive(Debug, Clone, Default)]
pub struct ParallelState {
    pub is_loading: bool,
    pub error: Option<Arc<ApiaryError>>,
    /// One entry per descriptor, in input order; `None` for aborted calls
    pub data: Option<Vec<Option<Value>>>,
}

pub struct ParallelRequests {
    client: Arc<dyn ApiClient>,
    state: watch::Sender<ParallelState>,
    last_batch: Mutex<Option<Vec<RequestDescriptor>>>,
    /// Incremented per issued batch; results of older batches are dropped
    run_id: AtomicU64,
    mounted: AtomicBool,
}

impl ParallelRequests {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self {
            client,
            state: watch::channel(ParallelState::default()).0,
            last_batch: Mutex::new(None),
            run_id: AtomicU64::new(0),
            mounted: AtomicBool::new(true),
        }
    }

    pub fn state(&self) -> ParallelState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ParallelState> {
        self.state.subscribe()
    }

    /// Issue `requests` unless it equals the previous batch.
    ///
    /// Returns whether the batch was issued. An empty batch resets the state
    /// without any network call.
    pub async fn run(&self, requests: Vec<RequestDescriptor>) -> bool {
        let previous = {
            let mut last = self.last_batch.lock();
            if last.as_ref() == Some(&requests) {
                return false;
            }
            last.replace(requests.clone())
        };

        if previous.is_some() {
            if let Err(e) = self.client.abort() {
                warn!("Failed to abort previous batch: {}", e);
            }
        }

        let run_id = self.run_id.fetch_add(1, Ordering::SeqCst) + 1;

        if requests.is_empty() {
            self.state.send_replace(ParallelState::default());
            return true;
        }

        debug!("Issuing batch of {} request(s)", requests.len());
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        let result = self.client.all(requests).await;

        if !self.mounted.load(Ordering::SeqCst) || self.run_id.load(Ordering::SeqCst) != run_id {
            debug!("Dropping results of superseded batch {}", run_id);
            return true;
        }

        self.state.send_modify(|state| {
            state.is_loading = false;
            match result {
                Ok(data) => state.data = Some(data),
                Err(error) => {
                    warn!("Parallel batch failed: {}", error);
                    state.error = Some(Arc::new(error));
                },
            }
        });
        true
    }

    /// Detach and abort anything in flight
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        if let Err(e) = self.client.abort() {
            warn!("Failed to abort batch on unmount: {}", e);
        }
    }
}

impl std::fmt::Debug for ParallelRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelRequests")
            .field("state", &*self.state.borrow())
            .field("run_id", &self.run_id.load(Ordering::SeqCst))
            .finish()
    }
}
