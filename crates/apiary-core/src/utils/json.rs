//! Lenient JSON parsing for response bodies.

use serde_json::Value;

/// Parse a response body as JSON, rescuing payloads wrapped in noise.
///
/// When direct parsing fails, the slice between the earliest `{`/`[` and the
/// latest `}`/`]` is parsed instead. If that also fails, or no opening
/// delimiter exists, the error from the first attempt is returned.
/// Empty bodies parse to `null`.
pub fn parse_lenient(text: &str) -> Result<Value, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    let original = match serde_json::from_str(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let start = text.find(['{', '[']);
    let end = text.rfind(['}', ']']);

    match (start, end) {
        (Some(start), Some(end)) if end > start => {
            serde_json::from_str(&text[start..=end]).map_err(|_| original)
        },
        _ => Err(original),
    }
}
