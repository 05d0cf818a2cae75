use super::schema::{EngineConfig, StatusStoreConfig};

pub(super) fn default_definitions_path() -> String {
    "metrics.toml".to_string()
}

pub(super) fn default_max_concurrent_evaluations() -> usize {
    8
}

pub(super) fn default_ready_queue_capacity() -> usize {
    256
}

pub(super) fn default_provider_timeout_secs() -> u64 {
    10
}

pub(super) fn default_stored_results() -> u8 {
    10
}

pub(super) fn default_status_store_enabled() -> bool {
    true
}

pub(super) fn default_status_store_path() -> String {
    "data/status".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_evaluations: default_max_concurrent_evaluations(),
            ready_queue_capacity: default_ready_queue_capacity(),
            provider_timeout_secs: default_provider_timeout_secs(),
            default_stored_results: default_stored_results(),
        }
    }
}

impl Default for StatusStoreConfig {
    fn default() -> Self {
        Self {
            enabled: default_status_store_enabled(),
            path: default_status_store_path(),
        }
    }
}
