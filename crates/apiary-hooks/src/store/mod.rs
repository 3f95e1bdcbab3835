//! External data stores that hold hook payloads.
//!
//! A hook bound to a store reads and writes its payload at a path inside
//! the store instead of a private slot, so several hooks (or any other
//! observer) can share one payload.

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;

/// Shared key/value store with change notification
pub trait DataStore: Send + Sync {
    /// Current value at `path`
    fn get(&self, path: &str) -> Option<Value>;

    /// Replace the value at `path` and notify watchers
    fn update(&self, path: &str, value: Value);

    /// Receiver that observes every later update at `path`
    fn watch(&self, path: &str) -> watch::Receiver<Option<Value>>;
}

/// In-process `DataStore` keyed by flat path strings
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, watch::Sender<Option<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given entries
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let store = Self::new();
        for (path, value) in entries {
            store.update(&path, value);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().borrow().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataStore for MemoryStore {
    fn get(&self, path: &str) -> Option<Value> {
        self.entries.get(path).and_then(|entry| entry.borrow().clone())
    }

    fn update(&self, path: &str, value: Value) {
        self.entries
            .entry(path.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(value));
    }

    fn watch(&self, path: &str) -> watch::Receiver<Option<Value>> {
        self.entries
            .entry(path.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }
}
