use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EvaluationError;
use crate::range::ResolvedRange;

use super::{
    MetricProvider, ProviderReading, QueryTransport, TransportRequest, format_value,
    reduce_samples, trim_target,
};

/// Reads numbers stored under a key: `GET {target}/{key}`.
///
/// The body is a whitespace or comma separated list; the store has no notion
/// of time, so the window is ignored and only the aggregation applies.
pub struct KeyValueProvider {
    target: String,
    transport: Arc<dyn QueryTransport>,
}

impl KeyValueProvider {
    pub fn new(target: &str, transport: Arc<dyn QueryTransport>) -> Self {
        Self {
            target: trim_target(target),
            transport,
        }
    }
}

#[async_trait]
impl MetricProvider for KeyValueProvider {
    fn backend(&self) -> &'static str {
        "keyvalue"
    }

    async fn execute(
        &self,
        query: &str,
        range: &ResolvedRange,
    ) -> Result<ProviderReading, EvaluationError> {
        let key = query.trim().trim_start_matches('/');
        if key.is_empty() {
            return Err(EvaluationError::ProviderQuery("key is empty".to_string()));
        }

        let request = TransportRequest::get(format!("{}/{}", self.target, key));
        let body = self.transport.get(request).await?;
        let samples = parse_samples(&body)?;
        let value = reduce_samples(&samples, range.aggregation)?;

        Ok(ProviderReading {
            value: format_value(value),
            raw: body,
        })
    }
}

fn parse_samples(body: &[u8]) -> Result<Vec<f64>, EvaluationError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| EvaluationError::ProviderQuery("value is not valid utf-8".to_string()))?;

    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<f64>().map_err(|_| {
                EvaluationError::ProviderQuery(format!("value {} is not a number", token))
            })
        })
        .collect()
}
