//! Case-insensitive, insertion-ordered header collections

use indexmap::IndexMap;

/// Name of the content type header
pub const CONTENT_TYPE: &str = "Content-Type";

/// Header map keyed case-insensitively.
///
/// The most recently written spelling of a name is the one sent on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    /// Lower-cased name -> (name as written, value)
    entries: IndexMap<String, (String, String)>,
}

impl HeaderSet {
    /// Create an empty header set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any existing value for the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries
            .insert(name.to_ascii_lowercase(), (name, value.into()));
    }

    /// Remove a header, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries
            .shift_remove(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
    }

    /// Look up a header value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    /// Whether a header is present
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Overlay another set; its values win on collision
    pub fn merge(&mut self, other: &HeaderSet) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Remove every header
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Owned `(name, value)` pairs in insertion order
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.entries.values().cloned().collect()
    }
}

impl<K, V> Extend<(K, V)> for HeaderSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = HeaderSet::new();
        headers.extend(iter);
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_case_insensitive_overwrite() {
        let mut headers = HeaderSet::new();
        headers.insert("content-type", "text/plain");
        headers.insert("Content-Type", "application/json");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(
            headers.to_pairs(),
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn test_remove_and_clear() {
        let mut headers: HeaderSet = [("X-A", "1"), ("X-B", "2")].into_iter().collect();
        assert_eq!(headers.remove("x-a"), Some("1".to_string()));
        assert!(!headers.contains("X-A"));
        assert!(headers.contains("x-b"));

        headers.clear();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let headers: HeaderSet = [("B", "1"), ("A", "2"), ("C", "3")].into_iter().collect();
        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_merge_later_wins() {
        let mut base: HeaderSet = [("Authorization", "Bearer a"), ("X-Env", "prod")]
            .into_iter()
            .collect();
        let overlay: HeaderSet = [("authorization", "Bearer b")].into_iter().collect();

        base.merge(&overlay);
        assert_eq!(base.get("Authorization"), Some("Bearer b"));
        assert_eq!(base.get("X-Env"), Some("prod"));
    }

    proptest! {
        #[test]
        fn last_write_wins_regardless_of_case(name in "[a-zA-Z-]{1,16}", first in "[a-z]{1,8}", second in "[a-z]{1,8}") {
            let mut headers = HeaderSet::new();
            headers.insert(name.to_ascii_lowercase(), first);
            headers.insert(name.to_ascii_uppercase(), second.clone());
            prop_assert_eq!(headers.len(), 1);
            prop_assert_eq!(headers.get(&name), Some(second.as_str()));
        }
    }
}
