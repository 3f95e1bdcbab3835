//! Common utilities for benchmarks

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};
use serde_json::{json, Value};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// JSON payload with `count` user records
pub fn users_payload(count: usize) -> Value {
    let users: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("user-{}", i),
                "email": format!("user-{}@example.com", i),
                "tags": ["a", "b", "c"],
            })
        })
        .collect();
    json!({ "results": users, "metadata": { "page": 1, "hasMore": true } })
}

/// The same payload wrapped in the kind of noise proxies prepend and append
pub fn noisy_body(count: usize) -> String {
    format!(")]}}',\n{}\n<!-- served by edge -->", users_payload(count))
}

/// apiary.toml content declaring `client_count` clients
pub fn apiary_toml_content(client_count: usize) -> String {
    let mut content = String::new();
    for i in 0..client_count {
        content.push_str(&format!("[clients.service-{}]\n", i));
        content.push_str(&format!("base_url = \"https://service-{}.example.com/api/v1\"\n", i));
        if i == 0 {
            content.push_str("default = true\n");
        }
        content.push_str("timeout_secs = 30\n\n");
        content.push_str(&format!("[clients.service-{}.headers]\n", i));
        content.push_str("Accept = \"application/json\"\n");
        content.push_str(&format!("X-Service = \"service-{}\"\n\n", i));
    }
    content
}
