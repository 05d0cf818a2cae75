use serde::Deserialize;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_definitions_path")]
    pub definitions_path: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub status_store: StatusStoreConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_concurrent_evaluations")]
    pub max_concurrent_evaluations: usize,
    #[serde(default = "default_ready_queue_capacity")]
    pub ready_queue_capacity: usize,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    #[serde(default = "default_stored_results")]
    pub default_stored_results: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusStoreConfig {
    #[serde(default = "default_status_store_enabled")]
    pub enabled: bool,
    #[serde(default = "default_status_store_path")]
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Prometheus,
    Datadog,
    #[serde(alias = "key-value", alias = "kv")]
    KeyValue,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prometheus => "prometheus",
            Self::Datadog => "datadog",
            Self::KeyValue => "keyvalue",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    pub target: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub app_key_env: Option<String>,
}
