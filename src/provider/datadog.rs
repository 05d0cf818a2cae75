use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::EvaluationError;
use crate::range::ResolvedRange;

use super::{
    MetricProvider, ProviderReading, QueryTransport, TransportRequest, format_value,
    reduce_samples, trim_target,
};

const INSTANT_LOOKBACK_SECS: i64 = 60;

pub struct DatadogProvider {
    target: String,
    api_key: Option<String>,
    app_key: Option<String>,
    transport: Arc<dyn QueryTransport>,
}

#[derive(Debug, Deserialize)]
struct DatadogResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    series: Vec<DatadogSeries>,
}

#[derive(Debug, Deserialize)]
struct DatadogSeries {
    #[serde(default)]
    pointlist: Vec<(f64, Option<f64>)>,
}

impl DatadogProvider {
    pub fn new(
        target: &str,
        api_key: Option<String>,
        app_key: Option<String>,
        transport: Arc<dyn QueryTransport>,
    ) -> Self {
        Self {
            target: trim_target(target),
            api_key,
            app_key,
            transport,
        }
    }

    /// Reads the key material from the environment variables named in `config`.
    pub fn from_config(config: &ProviderConfig, transport: Arc<dyn QueryTransport>) -> Self {
        let read_env = |name: &Option<String>| {
            name.as_deref()
                .and_then(|name| std::env::var(name).ok())
                .filter(|value| !value.trim().is_empty())
        };

        if let Some(name) = config.api_key_env.as_deref()
            && read_env(&config.api_key_env).is_none()
        {
            log::warn!(
                "datadog_api_key_missing provider={} env={}",
                config.name,
                name
            );
        }

        Self::new(
            &config.target,
            read_env(&config.api_key_env),
            read_env(&config.app_key_env),
            transport,
        )
    }

    fn build_request(&self, query: &str, range: &ResolvedRange) -> Result<TransportRequest, EvaluationError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            EvaluationError::ProviderQuery("datadog api key is not configured".to_string())
        })?;

        let from = if range.is_instant() {
            range.window_end - ChronoDuration::seconds(INSTANT_LOOKBACK_SECS)
        } else {
            range.window_start
        };

        let mut request = TransportRequest::get(format!("{}/api/v1/query", self.target))
            .with_param("from", from.timestamp().to_string())
            .with_param("to", range.window_end.timestamp().to_string())
            .with_param("query", query)
            .with_header("DD-API-KEY", api_key);

        if let Some(app_key) = self.app_key.as_deref() {
            request = request.with_header("DD-APPLICATION-KEY", app_key);
        }

        Ok(request)
    }
}

#[async_trait]
impl MetricProvider for DatadogProvider {
    fn backend(&self) -> &'static str {
        "datadog"
    }

    async fn execute(
        &self,
        query: &str,
        range: &ResolvedRange,
    ) -> Result<ProviderReading, EvaluationError> {
        let request = self.build_request(query, range)?;
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
    let response: DatadogResponse = serde_json::from_slice(body).map_err(|error| {
        EvaluationError::ProviderQuery(format!("invalid datadog response: {}", error))
    })?;

    if let Some(message) = response.error.or_else(|| response.errors.into_iter().next()) {
        return Err(EvaluationError::ProviderQuery(format!(
            "datadog query failed: {}",
            message
        )));
    }

    if let Some(status) = response.status.as_deref()
        && status != "ok"
    {
        return Err(EvaluationError::ProviderQuery(format!(
            "datadog query failed with status {}",
            status
        )));
    }

    let mut series = response.series;
    match series.len() {
        0 => Err(EvaluationError::ProviderQuery(
            "query returned no series".to_string(),
        )),
        1 => Ok(series
            .remove(0)
            .pointlist
            .into_iter()
            .filter_map(|(_, value)| value)
            .collect()),
        count => Err(EvaluationError::ProviderQuery(format!(
            "query returned {} series, expected exactly one",
            count
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use super::DatadogProvider;
    use crate::error::EvaluationError;
    use crate::provider::MetricProvider;
    use crate::provider::testing::ScriptedTransport;
    use crate::range::{Aggregation, ResolvedRange};

    const SERIES: &str = r#"{"status":"ok","series":[{"metric":"system.cpu.user","pointlist":[[1714564500000.0,10.0],[1714564560000.0,null],[1714564620000.0,30.0],[1714564680000.0,20.0]]}]}"#;

    fn provider(transport: Arc<ScriptedTransport>) -> DatadogProvider {
        DatadogProvider::new(
            "https://api.datadoghq.com/",
            Some("api-secret".to_string()),
            Some("app-secret".to_string()),
            transport,
        )
    }

    #[tokio::test]
    async fn range_query_sends_window_and_keys() {
        let transport = Arc::new(ScriptedTransport::returning(SERIES));
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let range = ResolvedRange {
            window_start: end - ChronoDuration::minutes(5),
            window_end: end,
            step: None,
            aggregation: Some(Aggregation::Max),
        };

        let reading = provider(transport.clone())
            .execute("avg:system.cpu.user{*}", &range)
            .await
            .expect("query should succeed");

        assert_eq!(reading.value, "30");
        let request = transport.last_request();
        assert_eq!(request.url, "https://api.datadoghq.com/api/v1/query");
        assert_eq!(request.param("from"), Some("1714564500"));
        assert_eq!(request.param("to"), Some("1714564800"));
        assert_eq!(request.param("query"), Some("avg:system.cpu.user{*}"));
        assert!(request.headers.contains(&("DD-API-KEY".to_string(), "api-secret".to_string())));
        assert!(
            request
                .headers
                .contains(&("DD-APPLICATION-KEY".to_string(), "app-secret".to_string()))
        );
    }

    #[tokio::test]
    async fn instant_query_looks_back_one_minute_and_takes_latest_point() {
        let transport = Arc::new(ScriptedTransport::returning(SERIES));
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let reading = provider(transport.clone())
            .execute("avg:system.cpu.user{*}", &ResolvedRange::instant(at))
            .await
            .expect("query should succeed");

        assert_eq!(reading.value, "20");
        assert_eq!(transport.last_request().param("from"), Some("1714564740"));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_calling_backend() {
        let transport = Arc::new(ScriptedTransport::returning(SERIES));
        let provider = DatadogProvider::new("https://api.datadoghq.com", None, None, transport.clone());

        let result = provider
            .execute("avg:system.cpu.user{*}", &ResolvedRange::instant(Utc::now()))
            .await;

        assert!(matches!(result, Err(EvaluationError::ProviderQuery(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn reported_errors_become_query_errors() {
        let transport = Arc::new(ScriptedTransport::returning(
            r#"{"errors":["Invalid query"]}"#,
        ));

        let error = provider(transport)
            .execute("bad", &ResolvedRange::instant(Utc::now()))
            .await
            .expect_err("query should fail");
        assert_eq!(error.to_string(), "datadog query failed: Invalid query");
    }

    #[tokio::test]
    async fn empty_series_is_a_query_error() {
        let transport = Arc::new(ScriptedTransport::returning(r#"{"status":"ok","series":[]}"#));

        let result = provider(transport)
            .execute("avg:missing{*}", &ResolvedRange::instant(Utc::now()))
            .await;
        assert!(matches!(result, Err(EvaluationError::ProviderQuery(_))));
    }
}
