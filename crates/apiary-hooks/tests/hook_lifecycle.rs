//! End-to-end hook scenarios over a registry built from apiary.toml

use std::sync::Arc;
use std::time::Duration;

use apiary_client::{
    ApiClient, ClientConfig, ClientRegistry, MockTransport, RequestDescriptor, TransportRequest,
    TransportResponse,
};
use apiary_config::toml::parse_apiary_toml;
use apiary_core::error::ApiaryResult;
use apiary_core::types::Params;
use apiary_hooks::{
    ApiHook, DataStore, FetchMode, HookOptions, MemoryStore, PageMergePolicy, ParallelRequests,
    ParamsChangePolicy, TriggerOutcome,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

const CONFIG: &str = r#"
[clients.catalog]
base_url = "https://catalog.test/api"
default = true

[clients.catalog.headers]
X-Client = "storefront"

[clients.accounts]
base_url = "https://accounts.test"
return_null_on_abort = false
"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn query_page(request: &TransportRequest) -> u64 {
    request
        .url
        .split(|c: char| c == '?' || c == '&')
        .find_map(|pair| pair.strip_prefix("page="))
        .and_then(|page| page.parse().ok())
        .unwrap_or(1)
}

/// Catalog search: two items per page, two pages per query
fn catalog_responder(request: &TransportRequest) -> ApiaryResult<TransportResponse> {
    let page = query_page(request);
    let term = request
        .url
        .split(|c: char| c == '?' || c == '&')
        .find_map(|pair| pair.strip_prefix("q="))
        .unwrap_or("all")
        .to_string();

    let body = json!({
        "items": [format!("{}-{}a", term, page), format!("{}-{}b", term, page)],
        "paging": {"page": page, "hasMore": page < 2},
    });
    Ok(TransportResponse::new(200, body.to_string()))
}

fn registry_with(transports: &[(&str, Arc<MockTransport>)]) -> ClientRegistry {
    let config = parse_apiary_toml(CONFIG).unwrap();
    let registry = ClientRegistry::new();

    for (name, settings) in &config.clients {
        let transport = transports
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.clone())
            .unwrap();
        let client_config = ClientConfig::from(settings).transport(transport);
        registry.register(name, client_config, settings.default).unwrap();
    }
    registry
}

async fn wait_until_idle(hook: &ApiHook, transport: &MockTransport, calls: usize) {
    while transport.completed() < calls || hook.state().is_loading() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_search_list_flow() {
    init_tracing();

    let catalog = Arc::new(MockTransport::new(catalog_responder));
    let accounts = Arc::new(MockTransport::echo());
    let registry = registry_with(&[("catalog", catalog.clone()), ("accounts", accounts.clone())]);
    let store = Arc::new(MemoryStore::new());

    let options = HookOptions::new("get:/products/search")
        .run_on_mount(true)
        .run_on_params_change(ParamsChangePolicy::debounced())
        .pagination(PageMergePolicy::with_keys("items", "paging"))
        .store(store.clone(), "catalog.search");
    let hook = ApiHook::from_registry(&registry, None, options).unwrap();

    assert!(hook.mount().await.is_completed());
    let first = catalog.last_request().unwrap();
    assert_eq!(first.url, "https://catalog.test/api/products/search");
    assert_eq!(first.header("x-client"), Some("storefront"));
    assert_eq!(
        store.get("catalog.search"),
        Some(json!({"results": ["all-1a", "all-1b"], "metadata": {"page": 1, "hasMore": true}}))
    );

    assert!(hook.load_more().await.is_completed());
    assert!(catalog.last_request().unwrap().url.ends_with("?page=2"));
    assert!(!hook.has_more());
    assert!(matches!(hook.load_more().await, TriggerOutcome::Skipped));

    // Typing into the search box refreshes once, after the debounce window
    let on_query = hook.handle_on_change("q");
    on_query(json!("la"));
    tokio::time::advance(Duration::from_millis(150)).await;
    on_query(json!("lamp"));
    tokio::time::advance(Duration::from_millis(301)).await;
    wait_until_idle(&hook, &catalog, 3).await;

    assert_eq!(catalog.calls(), 3);
    assert_eq!(
        catalog.last_request().unwrap().url,
        "https://catalog.test/api/products/search?q=lamp"
    );
    let stored = store.get("catalog.search").unwrap();
    assert_eq!(stored["results"], json!(["lamp-1a", "lamp-1b"]));

    // The other client was never touched
    assert_eq!(accounts.calls(), 0);
}

#[tokio::test]
async fn test_named_client_errors_reach_callbacks() {
    init_tracing();

    let catalog = Arc::new(MockTransport::new(catalog_responder));
    let accounts = Arc::new(MockTransport::json(401, json!({"message": "session expired"})));
    let registry = registry_with(&[("catalog", catalog), ("accounts", accounts.clone())]);

    let errors = Arc::new(Mutex::new(Vec::<Option<u16>>::new()));
    let options = HookOptions::new("me")
        .method(apiary_core::types::HttpMethod::Get)
        .on_error({
            let errors = errors.clone();
            move |err| {
                let errors = errors.clone();
                async move { errors.lock().push(err.status()) }
            }
        });
    let hook = ApiHook::from_registry(&registry, Some("accounts"), options).unwrap();

    let outcome = hook.send(FetchMode::Initial, None).await;
    assert_eq!(outcome.error().map(|e| e.to_string()), Some("session expired".to_string()));
    assert_eq!(*errors.lock(), vec![Some(401)]);
    assert_eq!(accounts.last_request().unwrap().url, "https://accounts.test/me");
}

#[tokio::test]
async fn test_abort_raises_inside_hook_without_error() {
    let catalog = Arc::new(MockTransport::new(catalog_responder));
    let accounts = Arc::new(MockTransport::json(200, json!({})));
    accounts.hold();
    let registry = registry_with(&[("catalog", catalog), ("accounts", accounts.clone())]);

    // accounts raises on abort instead of resolving to null; the hook still
    // treats it as a cancellation rather than a failure
    let hook = ApiHook::from_registry(&registry, Some("accounts"), HookOptions::new("me")).unwrap();
    let pending = tokio::spawn({
        let hook = hook.clone();
        async move { hook.send(FetchMode::Initial, None).await }
    });
    while accounts.calls() < 1 {
        tokio::task::yield_now().await;
    }

    hook.client().abort().unwrap();
    assert!(matches!(pending.await.unwrap(), TriggerOutcome::Aborted));
    assert!(hook.state().error.is_none());
}

#[tokio::test]
async fn test_parallel_requests_through_registry() {
    let catalog = Arc::new(MockTransport::new(catalog_responder));
    let accounts = Arc::new(MockTransport::echo());
    let registry = Arc::new(registry_with(&[("catalog", catalog.clone()), ("accounts", accounts)]));

    let client: Arc<dyn ApiClient> = registry.clone();
    let parallel = ParallelRequests::new(client);

    let mut page_two = Params::new();
    page_two.insert("page".to_string(), json!(2));
    let batch = vec![
        RequestDescriptor::get("products"),
        RequestDescriptor::get("products").params(page_two),
    ];

    let mut rx = parallel.subscribe();
    assert!(parallel.run(batch.clone()).await);
    assert!(rx.has_changed().unwrap());

    let state = rx.borrow_and_update().clone();
    let data = state.data.unwrap();
    assert_eq!(data[0].as_ref().unwrap()["paging"]["page"], json!(1));
    assert_eq!(data[1].as_ref().unwrap()["paging"]["page"], json!(2));

    assert!(!parallel.run(batch).await);
    assert_eq!(catalog.calls(), 2);

    parallel.unmount();
    assert!(registry.use_client(Some("catalog")).unwrap().abort_generation() >= 1);
}

#[tokio::test]
async fn test_store_is_shared_between_hooks() {
    let catalog = Arc::new(MockTransport::new(catalog_responder));
    let accounts = Arc::new(MockTransport::echo());
    let registry = registry_with(&[("catalog", catalog.clone()), ("accounts", accounts)]);
    let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new());

    let writer = ApiHook::from_registry(
        &registry,
        None,
        HookOptions::new("get:featured").store(store.clone(), "featured"),
    )
    .unwrap();
    let reader = ApiHook::from_registry(
        &registry,
        None,
        HookOptions::new("get:featured").run_on_mount(true).store(store.clone(), "featured"),
    )
    .unwrap();

    let mut updates = reader.watch_response();
    writer.refresh().await;

    updates.changed().await.unwrap();
    let seen: Option<Value> = updates.borrow().clone();
    assert_eq!(seen.unwrap()["items"], json!(["all-1a", "all-1b"]));

    // Data is already present, so the reader does not fetch on mount
    assert!(matches!(reader.mount().await, TriggerOutcome::Skipped));
    assert_eq!(catalog.calls(), 1);
}
