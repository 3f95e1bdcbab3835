//! apiary.toml configuration parsing and serialization

use apiary_core::error::ApiaryError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// Complete apiary.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiaryToml {
    /// Named backends, in declaration order
    #[serde(default)]
    pub clients: IndexMap<String, ClientSettings>,
}

/// Declarative settings for one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Base URL every endpoint is joined onto
    pub base_url: String,

    /// Static headers sent with every request
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,

    /// Whether this client is the registry default
    #[serde(default)]
    pub default: bool,

    /// Resolve aborted requests to `None` instead of failing
    #[serde(default = "default_true")]
    pub return_null_on_abort: bool,

    /// Transport timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl ClientSettings {
    /// Settings with only a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: IndexMap::new(),
            default: false,
            return_null_on_abort: true,
            timeout_secs: None,
        }
    }
}

impl ApiaryToml {
    /// Name of the client flagged `default = true`, if any
    pub fn default_client(&self) -> Option<&str> {
        self.clients
            .iter()
            .find(|(_, settings)| settings.default)
            .map(|(name, _)| name.as_str())
    }
}

/// Parse apiary.toml content
pub fn parse_apiary_toml(content: &str) -> ConfigResult<ApiaryToml> {
    let config: ApiaryToml = ::toml::from_str(content).map_err(|e| {
        let (line, column) = e
            .span()
            .map(|span| line_column(content, span.start))
            .unwrap_or((0, 0));
        ApiaryError::TomlParse {
            message: e.message().to_string(),
            line,
            column,
        }
    })?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize ApiaryToml to TOML string
pub fn serialize_apiary_toml(config: &ApiaryToml) -> ConfigResult<String> {
    ::toml::to_string_pretty(config).map_err(|e| ApiaryError::ConfigValidation {
        field: "config".to_string(),
        reason: format!("TOML serialization error: {}", e),
    })
}

/// Load apiary.toml from file
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<ApiaryToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ApiaryError::io(format!("Failed to read {}", path), e))?;

    tracing::debug!("Loaded client configuration from {}", path);

    parse_apiary_toml(&content).map_err(|e| match e {
        ApiaryError::ConfigValidation { field, reason } => ApiaryError::ConfigValidation {
            field,
            reason: format!("In file {}: {}", path, reason),
        },
        other => other,
    })
}

/// Validate a parsed configuration
pub fn validate_config(config: &ApiaryToml) -> ConfigResult<()> {
    let mut default_name: Option<&str> = None;

    for (name, settings) in &config.clients {
        if name.trim().is_empty() {
            return Err(ApiaryError::InvalidClientName);
        }

        validate_base_url(name, &settings.base_url)?;

        if settings.default {
            if let Some(existing) = default_name {
                return Err(ApiaryError::DuplicateDefault {
                    name: name.clone(),
                    existing: existing.to_string(),
                });
            }
            default_name = Some(name);
        }
    }

    Ok(())
}

/// Base URLs must be absolute http(s) URLs
fn validate_base_url(name: &str, base_url: &str) -> ConfigResult<()> {
    let field = format!("clients.{}.base_url", name);

    let parsed = url::Url::parse(base_url).map_err(|e| ApiaryError::ConfigValidation {
        field: field.clone(),
        reason: format!("'{}' is not a valid URL: {}", base_url, e),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ApiaryError::ConfigValidation {
            field,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = &content[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map(|i| offset - i).unwrap_or(offset + 1);
    (line, column)
}
