//! URL utilities for building request URLs.

use ::url::form_urlencoded;

use crate::types::{param_to_string, Params};
use serde_json::Value;

/// Join a base URL and an endpoint with exactly one slash between them.
///
/// Runs of slashes collapse to a single slash, except the `//` that directly
/// follows a scheme colon.
pub fn join_url(base: &str, endpoint: &str) -> String {
    let joined = format!("{}/{}", base, endpoint);
    let mut out = String::with_capacity(joined.len());

    let mut prev: Option<char> = None;
    let mut run_len = 0usize;
    let mut after_colon = false;

    for ch in joined.chars() {
        if ch == '/' {
            run_len += 1;
            if run_len == 1 {
                after_colon = prev == Some(':');
            }
            let limit = if after_colon { 2 } else { 1 };
            if run_len > limit {
                continue;
            }
        } else {
            run_len = 0;
        }
        out.push(ch);
        prev = Some(ch);
    }

    out
}

/// Append parameters to a URL as a form-urlencoded query string.
///
/// `null` values are skipped and array values repeat their key.
pub fn append_query(url: &str, params: &Params) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    for (key, value) in params {
        match value {
            Value::Null => {},
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    serializer.append_pair(key, &param_to_string(item));
                }
            },
            other => {
                serializer.append_pair(key, &param_to_string(other));
            },
        }
    }

    let query = serializer.finish();
    if query.is_empty() {
        return url.to_string();
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, query)
}
