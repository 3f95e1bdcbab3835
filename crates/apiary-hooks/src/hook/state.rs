//! Observable request state

use std::sync::Arc;

use apiary_core::error::ApiaryError;
use apiary_core::types::Params;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Why a trigger was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Initial,
    Refresh,
    Pagination,
}

/// Lifecycle state of one hook instance
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    pub params: Params,
    /// Last payload, or the accumulated `{results, metadata}` under pagination
    pub response: Option<Value>,
    pub error: Option<Arc<ApiaryError>>,
    pub is_initial_loading: bool,
    pub is_refreshing: bool,
    pub is_loading_more: bool,
    /// Set by the first successful fetch and never cleared
    pub has_fetched_once: bool,
    pub last_fetch_timestamp: Option<DateTime<Utc>>,
}

impl RequestState {
    /// Whether any trigger is in flight
    pub fn is_loading(&self) -> bool {
        self.is_initial_loading || self.is_refreshing || self.is_loading_more
    }

    /// Clear the loading flag owned by `mode`
    pub(crate) fn clear_flag(&mut self, mode: FetchMode) {
        match mode {
            FetchMode::Initial => self.is_initial_loading = false,
            FetchMode::Refresh => self.is_refreshing = false,
            FetchMode::Pagination => self.is_loading_more = false,
        }
    }
}

/// What a trigger ended up doing
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// Response stored and `on_success` called
    Completed,
    /// Error recorded and `on_error` called
    Failed(Arc<ApiaryError>),
    /// The request was aborted; nothing stored
    Aborted,
    /// The hook was unmounted before the response arrived.
    ///
    /// Nothing is stored and no callback runs. The loading flag of the
    /// trigger is still cleared so a later `mount` is not rejected by a
    /// stale in-flight flag.
    Discarded,
    /// Another trigger was already in flight
    Rejected,
    /// `validate_params` refused the params
    Invalid,
    /// The trigger condition did not hold
    Skipped,
}

impl TriggerOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TriggerOutcome::Completed)
    }

    /// Whether a network call was issued
    pub fn reached_network(&self) -> bool {
        matches!(
            self,
            TriggerOutcome::Completed
                | TriggerOutcome::Failed(_)
                | TriggerOutcome::Aborted
                | TriggerOutcome::Discarded
        )
    }

    pub fn error(&self) -> Option<&Arc<ApiaryError>> {
        match self {
            TriggerOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}
