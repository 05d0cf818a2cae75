use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use serde::Deserialize;

use crate::error::EvaluationError;
use crate::range::ResolvedRange;

use super::{
    MetricProvider, ProviderReading, QueryTransport, TransportRequest, format_value,
    reduce_samples, trim_target,
};

const DEFAULT_STEP_SECS: i64 = 60;

pub struct PrometheusProvider {
    target: String,
    transport: Arc<dyn QueryTransport>,
}

#[derive(Debug, Deserialize)]
struct PrometheusResponse {
    status: String,
    #[serde(default)]
    data: Option<PrometheusData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrometheusData {
    result: PrometheusResult,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PrometheusResult {
    Series(Vec<PrometheusSeries>),
    Scalar((f64, String)),
}

#[derive(Debug, Deserialize)]
struct PrometheusSeries {
    #[serde(default)]
    value: Option<(f64, String)>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

impl PrometheusProvider {
    pub fn new(target: &str, transport: Arc<dyn QueryTransport>) -> Self {
        Self {
            target: trim_target(target),
            transport,
        }
    }

    fn build_request(&self, query: &str, range: &ResolvedRange) -> TransportRequest {
        let use_range_api =
            !range.is_instant() && (range.step.is_some() || range.aggregation.is_some());

        if !use_range_api {
            return TransportRequest::get(format!("{}/api/v1/query", self.target))
                .with_param("query", query)
                .with_param("time", timestamp(range.window_end));
        }

        let step = range.step.unwrap_or_else(|| {
            ChronoDuration::seconds(DEFAULT_STEP_SECS).min(range.window())
        });

        TransportRequest::get(format!("{}/api/v1/query_range", self.target))
            .with_param("query", query)
            .with_param("start", timestamp(range.window_start))
            .with_param("end", timestamp(range.window_end))
            .with_param("step", format_value(step.num_milliseconds() as f64 / 1000.0))
    }
}

#[async_trait]
impl MetricProvider for PrometheusProvider {
    fn backend(&self) -> &'static str {
        "prometheus"
    }

    async fn execute(
        &self,
        query: &str,
        range: &ResolvedRange,
    ) -> Result<ProviderReading, EvaluationError> {
        let request = self.build_request(query, range);
        let body = self.transport.get(request).await?;
        let samples = parse_samples(&body)?;
        let value = reduce_samples(&samples, range.aggregation)?;

        Ok(ProviderReading {
            value: format_value(value),
            raw: body,
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_samples(body: &[u8]) -> Result<Vec<f64>, EvaluationError> {
    let response: PrometheusResponse = serde_json::from_slice(body).map_err(|error| {
        EvaluationError::ProviderQuery(format!("invalid prometheus response: {}", error))
    })?;

    if response.status != "success" {
        return Err(EvaluationError::ProviderQuery(format!(
            "prometheus query failed: {}",
            response.error.unwrap_or(response.status)
        )));
    }

    let data = response.data.ok_or_else(|| {
        EvaluationError::ProviderQuery("prometheus response has no data".to_string())
    })?;

    let raw_samples = match data.result {
        PrometheusResult::Scalar(sample) => vec![sample],
        PrometheusResult::Series(mut series) => match series.len() {
            0 => {
                return Err(EvaluationError::ProviderQuery(
                    "query returned no series".to_string(),
                ));
            }
            1 => {
                let single = series.remove(0);
                match single.value {
                    Some(sample) => vec![sample],
                    None => single.values,
                }
            }
            count => {
                return Err(EvaluationError::ProviderQuery(format!(
                    "query returned {} series, expected exactly one",
                    count
                )));
            }
        },
    };

    raw_samples
        .into_iter()
        .map(|(_, text)| {
            text.parse::<f64>().map_err(|_| {
                EvaluationError::ProviderQuery(format!("sample {} is not a number", text))
            })
        })
        .collect()
}
