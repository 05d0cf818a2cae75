use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RANGE_INTERVAL: &str = "5m";

/// Longest cadence a timer is armed with; larger intervals are clamped to it.
pub const MAX_CADENCE_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    #[serde(default = "default_range_interval")]
    pub interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_results: Option<u8>,
}

impl Default for RangeSpec {
    fn default() -> Self {
        Self {
            interval: default_range_interval(),
            step: None,
            aggregation: None,
            stored_results: None,
        }
    }
}

fn default_range_interval() -> String {
    DEFAULT_RANGE_INTERVAL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: String,
    pub provider: ProviderRef,
    pub query: String,
    pub fetch_interval_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeSpec>,
}

impl MetricDefinition {
    pub fn new(name: impl Into<String>, provider: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: ProviderRef {
                name: provider.into(),
            },
            query: query.into(),
            fetch_interval_seconds: 60,
            range: None,
        }
    }

    pub fn with_fetch_interval(mut self, seconds: u64) -> Self {
        self.fetch_interval_seconds = seconds;
        self
    }

    pub fn with_range(mut self, range: RangeSpec) -> Self {
        self.range = Some(range);
        self
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_seconds.clamp(1, MAX_CADENCE_SECS))
    }

    /// `stored_results` unset falls back to the engine default; an explicit 0 keeps no history.
    pub fn stored_results(&self, engine_default: u8) -> usize {
        self.range
            .as_ref()
            .and_then(|range| range.stored_results)
            .unwrap_or(engine_default) as usize
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.provider.name.trim().is_empty() {
            return Err(format!("{}: provider.name must not be empty", self.name));
        }
        if self.query.trim().is_empty() {
            return Err(format!("{}: query must not be empty", self.name));
        }
        if self.fetch_interval_seconds == 0 {
            return Err(format!(
                "{}: fetch_interval_seconds must be at least 1",
                self.name
            ));
        }
        Ok(())
    }
}
