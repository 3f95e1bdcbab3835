//! Pagination policies for accumulating paged responses.
//!
//! Under pagination a hook stores `{"results": [...], "metadata": {...}}`
//! and asks the policy how to read each raw response and how to fold a new
//! page into the results collected so far.

use serde_json::{json, Value};

/// Key under which accumulated results are stored
pub const RESULTS_KEY: &str = "results";
/// Key under which the latest page metadata is stored
pub const METADATA_KEY: &str = "metadata";

/// Caller-supplied rules for reading and merging pages
pub trait PaginationPolicy: Send + Sync {
    /// Items carried by one raw response
    fn results(&self, response: &Value) -> Vec<Value>;

    /// Page metadata carried by one raw response
    fn metadata(&self, response: &Value) -> Value;

    /// Fold `new` into `existing` for the page that was just requested
    fn merge(&self, existing: Vec<Value>, new: Vec<Value>, page: u64) -> Vec<Value>;

    /// Parameter the requested page number is sent under
    fn page_key(&self) -> &str {
        "page"
    }

    /// Page number recorded in `metadata`, `0` when absent
    fn page(&self, metadata: &Value) -> u64 {
        metadata.get("page").and_then(Value::as_u64).unwrap_or(0)
    }

    /// Whether `metadata` reports further pages
    fn has_more(&self, metadata: &Value) -> bool {
        metadata.get("hasMore").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Reference policy: page 1 (or lower) replaces, later pages append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMergePolicy {
    results_key: String,
    metadata_key: String,
}

impl PageMergePolicy {
    /// Read `results` and `metadata` from each response
    pub fn new() -> Self {
        Self::with_keys(RESULTS_KEY, METADATA_KEY)
    }

    /// Read items and metadata from custom response fields
    pub fn with_keys(results_key: impl Into<String>, metadata_key: impl Into<String>) -> Self {
        Self {
            results_key: results_key.into(),
            metadata_key: metadata_key.into(),
        }
    }
}

impl Default for PageMergePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginationPolicy for PageMergePolicy {
    fn results(&self, response: &Value) -> Vec<Value> {
        response
            .get(&self.results_key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    fn metadata(&self, response: &Value) -> Value {
        response.get(&self.metadata_key).cloned().unwrap_or(Value::Null)
    }

    fn merge(&self, mut existing: Vec<Value>, new: Vec<Value>, page: u64) -> Vec<Value> {
        if page <= 1 {
            return new;
        }
        existing.extend(new);
        existing
    }
}

/// Initial stored value of a paginated hook
pub fn empty_page() -> Value {
    json!({ RESULTS_KEY: [] })
}

/// Build the stored `{results, metadata}` value
pub fn paged_value(results: Vec<Value>, metadata: Value) -> Value {
    json!({
        RESULTS_KEY: results,
        METADATA_KEY: metadata,
    })
}

/// Results accumulated in a stored value
pub fn stored_results(stored: Option<&Value>) -> Vec<Value> {
    stored
        .and_then(|value| value.get(RESULTS_KEY))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Metadata of the last page in a stored value
pub fn stored_metadata(stored: Option<&Value>) -> Value {
    stored
        .and_then(|value| value.get(METADATA_KEY))
        .cloned()
        .unwrap_or(Value::Null)
}
