//! Request-state hooks for Apiary
//!
//! This crate layers component-lifecycle behaviour on top of an `ApiClient`:
//!
//! - `ApiHook`: params, loading flags, pagination and store sync for one
//!   endpoint, re-run on mount, focus, params and dependency changes
//! - `ParallelRequests`: one batch of concurrent requests with positional
//!   results
//! - `DataStore`: shared payload storage, with `MemoryStore` in-process
//! - `PaginationPolicy`: how pages are read and merged, with `PageMergePolicy`

pub mod hook;
pub mod pagination;
pub mod parallel;
pub mod store;

// Re-export main types
pub use hook::{
    ApiHook, FetchMode, FocusPolicy, HookOptions, ParamsChangePolicy, RequestState,
    TriggerOutcome, DEFAULT_DEBOUNCE,
};
pub use pagination::{PageMergePolicy, PaginationPolicy};
pub use parallel::{ParallelRequests, ParallelState};
pub use store::{DataStore, MemoryStore};
