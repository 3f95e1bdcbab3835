//! Request parameter mappings.

use serde_json::{Map, Value};

/// Query or body parameters, in insertion order
pub type Params = Map<String, Value>;

/// Shallow-merge `overrides` on top of `base`
pub fn merge_params(base: &Params, overrides: &Params) -> Params {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Render a parameter value the way it appears in a query string or form.
///
/// Strings are emitted without quotes, everything else as JSON text.
pub fn param_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    #[test]
    fn test_merge_params_overrides_win() {
        let base = params(json!({"q": "rust", "page": 1}));
        let overrides = params(json!({"page": 2, "sort": "desc"}));

        let merged = merge_params(&base, &overrides);
        assert_eq!(merged.get("q"), Some(&json!("rust")));
        assert_eq!(merged.get("page"), Some(&json!(2)));
        assert_eq!(merged.get("sort"), Some(&json!("desc")));
        // base untouched
        assert_eq!(base.get("page"), Some(&json!(1)));
    }

    #[test]
    fn test_param_to_string() {
        assert_eq!(param_to_string(&json!("a b")), "a b");
        assert_eq!(param_to_string(&json!(3)), "3");
        assert_eq!(param_to_string(&json!(true)), "true");
        assert_eq!(param_to_string(&json!({"k": 1})), "{\"k\":1}");
    }
}
