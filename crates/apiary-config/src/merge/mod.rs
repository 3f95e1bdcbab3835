//! Configuration discovery and environment overrides

use std::collections::HashMap;

use apiary_core::error::ApiaryError;
use camino::Utf8PathBuf;

use crate::toml::{load_from_file, validate_config, ApiaryToml};
use crate::ConfigResult;

/// File name searched for by the loader
pub const CONFIG_FILE_NAME: &str = "apiary.toml";

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "APIARY_";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Load the project configuration and apply process environment overrides
    pub async fn load(&self) -> ConfigResult<(ApiaryToml, Utf8PathBuf)> {
        let path = self.resolve_config_path(CONFIG_FILE_NAME)?;
        if !path.exists() {
            return Err(ApiaryError::ConfigValidation {
                field: "config".to_string(),
                reason: format!(
                    "No {} found in {} or parent directories",
                    CONFIG_FILE_NAME, self.cwd
                ),
            });
        }

        let mut config = load_from_file(&path).await?;
        Self::apply_env_overrides(&mut config, &Self::env_overrides())?;
        Ok((config, path))
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> ConfigResult<Utf8PathBuf> {
        let mut current = self.cwd.as_path();

        loop {
            let config_path = current.join(filename);
            if config_path.exists() {
                return Ok(config_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        // Return path in current directory even if it doesn't exist
        Ok(self.cwd.join(filename))
    }

    /// Collect `APIARY_*` variables from the process environment
    pub fn env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }

    /// Apply `APIARY_<CLIENT>_BASE_URL` and `APIARY_<CLIENT>_TIMEOUT_SECS`
    /// overrides. Client names are matched upper-cased with `-` as `_`.
    pub fn apply_env_overrides(
        config: &mut ApiaryToml,
        env: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (name, settings) in config.clients.iter_mut() {
            let key = env_key(name);

            if let Some(base_url) = env.get(&format!("{}{}_BASE_URL", ENV_PREFIX, key)) {
                tracing::debug!("Overriding base_url of client '{}' from environment", name);
                settings.base_url = base_url.clone();
            }

            let timeout_var = format!("{}{}_TIMEOUT_SECS", ENV_PREFIX, key);
            if let Some(raw) = env.get(&timeout_var) {
                let secs = raw.parse::<u64>().map_err(|e| ApiaryError::ConfigValidation {
                    field: timeout_var.clone(),
                    reason: format!("'{}' is not a number of seconds: {}", raw, e),
                })?;
                settings.timeout_secs = Some(secs);
            }
        }

        validate_config(config)
    }
}

fn env_key(client_name: &str) -> String {
    client_name.to_uppercase().replace('-', "_")
}
