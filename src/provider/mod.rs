mod datadog;
mod gateway;
mod keyvalue;
mod prometheus;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::EvaluationError;
use crate::range::{Aggregation, ResolvedRange};

pub use datadog::DatadogProvider;
pub use gateway::ProviderGateway;
pub use keyvalue::KeyValueProvider;
pub use prometheus::PrometheusProvider;
pub use transport::{HttpTransport, QueryTransport, TransportError, TransportRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReading {
    pub value: String,
    pub raw: Vec<u8>,
}

#[async_trait]
pub trait MetricProvider: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn execute(
        &self,
        query: &str,
        range: &ResolvedRange,
    ) -> Result<ProviderReading, EvaluationError>;
}

pub fn build_provider(
    config: &ProviderConfig,
    transport: Arc<dyn QueryTransport>,
) -> Arc<dyn MetricProvider> {
    match config.kind {
        ProviderKind::Prometheus => Arc::new(PrometheusProvider::new(&config.target, transport)),
        ProviderKind::Datadog => Arc::new(DatadogProvider::from_config(config, transport)),
        ProviderKind::KeyValue => Arc::new(KeyValueProvider::new(&config.target, transport)),
    }
}

/// Shortest decimal form that round-trips: `42`, `0.25`, `-1.5`. Infinities
/// use the Prometheus spelling `+Inf` / `-Inf`.
pub(crate) fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{}", value)
    }
}

/// Applies `aggregation` locally, or takes the latest sample when none is set.
pub(crate) fn reduce_samples(
    samples: &[f64],
    aggregation: Option<Aggregation>,
) -> Result<f64, EvaluationError> {
    let reduced = match aggregation {
        Some(aggregation) => aggregation.apply(samples),
        None => samples.iter().rev().copied().find(|value| !value.is_nan()),
    };

    reduced.ok_or_else(|| EvaluationError::ProviderQuery("query returned no usable samples".to_string()))
}

pub(crate) fn trim_target(target: &str) -> String {
    target.trim().trim_end_matches('/').to_string()
}
