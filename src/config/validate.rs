use std::collections::HashSet;

use thiserror::Error;

use super::schema::{Config, ProviderKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Validation(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.definitions_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "definitions_path must not be empty".to_string(),
            ));
        }
        if self.engine.max_concurrent_evaluations == 0 {
            return Err(ConfigError::Validation(
                "engine.max_concurrent_evaluations must be greater than 0".to_string(),
            ));
        }
        if self.engine.ready_queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "engine.ready_queue_capacity must be greater than 0".to_string(),
            ));
        }
        if self.engine.provider_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "engine.provider_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.status_store.enabled && self.status_store.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "status_store.path must not be empty when status_store.enabled is true"
                    .to_string(),
            ));
        }

        let mut names = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "providers.name must not be empty".to_string(),
                ));
            }
            if !names.insert(provider.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "provider {} is declared more than once",
                    provider.name
                )));
            }
            if provider.target.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "provider {}: target must not be empty",
                    provider.name
                )));
            }
            if provider.kind == ProviderKind::Datadog
                && provider
                    .api_key_env
                    .as_deref()
                    .is_none_or(|value| value.trim().is_empty())
            {
                return Err(ConfigError::Validation(format!(
                    "provider {}: api_key_env is required for datadog providers",
                    provider.name
                )));
            }
        }

        Ok(())
    }
}
