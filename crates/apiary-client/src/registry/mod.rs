//! Named client registry with an optional default client.
//!
//! The registry itself implements `ApiClient` by delegating every call to
//! the default client, so callers that never name a backend can use it as
//! a plain client.

use std::sync::Arc;

use apiary_config::ApiaryToml;
use apiary_core::error::{ApiaryError, ApiaryResult};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{ApiClient, RequestOptions};
use crate::client::{ClientConfig, HttpClient};

#[derive(Debug, Default)]
struct RegistryState {
    clients: IndexMap<String, Arc<HttpClient>>,
    default: Option<String>,
}

/// Process-wide map of named clients
#[derive(Debug, Default)]
pub struct ClientRegistry {
    state: RwLock<RegistryState>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding every client declared in `apiary.toml`
    pub fn from_config(config: &ApiaryToml) -> ApiaryResult<Self> {
        let registry = Self::new();
        for (name, settings) in &config.clients {
            registry.register(name, ClientConfig::from(settings), settings.default)?;
        }
        info!("Registered {} client(s) from configuration", config.clients.len());
        Ok(registry)
    }

    /// Create and register a client.
    ///
    /// Fails on an empty name, a name already in use, or a second default.
    pub fn register(&self, name: &str, config: ClientConfig, is_default: bool) -> ApiaryResult<Arc<HttpClient>> {
        // Validate before building so a rejected registration has no side effects
        self.check_registration(name, is_default)?;
        let client = Arc::new(HttpClient::new(config)?);
        self.register_client(name, client.clone(), is_default)?;
        Ok(client)
    }

    /// Register an already-built client
    pub fn register_client(&self, name: &str, client: Arc<HttpClient>, is_default: bool) -> ApiaryResult<()> {
        let mut state = self.state.write();
        Self::validate(&state, name, is_default)?;

        debug!("Registering client '{}' -> {}", name, client.base_url());
        state.clients.insert(name.to_string(), client);
        if is_default {
            state.default = Some(name.to_string());
        }
        Ok(())
    }

    /// Named client, or the default client when `name` is `None`
    pub fn use_client(&self, name: Option<&str>) -> ApiaryResult<Arc<HttpClient>> {
        let state = self.state.read();
        match name {
            Some(name) => state
                .clients
                .get(name)
                .cloned()
                .ok_or_else(|| ApiaryError::ClientNotFound {
                    name: name.to_string(),
                }),
            None => state
                .default
                .as_ref()
                .and_then(|name| state.clients.get(name))
                .cloned()
                .ok_or(ApiaryError::NoDefaultClient),
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.state.read().clients.contains_key(name)
    }

    pub fn default_client_name(&self) -> Option<String> {
        self.state.read().default.clone()
    }

    /// Registered names in registration order
    pub fn registered_client_names(&self) -> Vec<String> {
        self.state.read().clients.keys().cloned().collect()
    }

    fn check_registration(&self, name: &str, is_default: bool) -> ApiaryResult<()> {
        Self::validate(&self.state.read(), name, is_default)
    }

    fn validate(state: &RegistryState, name: &str, is_default: bool) -> ApiaryResult<()> {
        if name.trim().is_empty() {
            return Err(ApiaryError::InvalidClientName);
        }
        if state.clients.contains_key(name) {
            return Err(ApiaryError::DuplicateClient {
                name: name.to_string(),
            });
        }
        if is_default {
            if let Some(existing) = &state.default {
                return Err(ApiaryError::DuplicateDefault {
                    name: name.to_string(),
                    existing: existing.clone(),
                });
            }
        }
        Ok(())
    }

    fn default_client(&self) -> ApiaryResult<Arc<HttpClient>> {
        self.use_client(None)
    }
}

#[async_trait]
impl ApiClient for ClientRegistry {
    async fn request(&self, target: &str, options: RequestOptions) -> ApiaryResult<Option<Value>> {
        let client = self.default_client()?;
        client.request(target, options).await
    }

    fn abort(&self) -> ApiaryResult<()> {
        self.default_client()?.abort()
    }

    fn set_header(&self, name: &str, value: &str) -> ApiaryResult<()> {
        self.default_client()?.set_header(name, value)
    }

    fn unset_header(&self, name: &str) -> ApiaryResult<()> {
        self.default_client()?.unset_header(name)
    }

    fn clear_headers(&self) -> ApiaryResult<()> {
        self.default_client()?.clear_headers()
    }
}
