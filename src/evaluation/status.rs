use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::definitions::RangeSpec;

/// Outcome of one evaluation cycle. Exactly one of `value` / `err_msg` is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub range: Option<RangeSpec>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub err_msg: String,
}

impl EvaluationResult {
    pub fn success(value: String, range: Option<RangeSpec>, at: DateTime<Utc>) -> Self {
        Self {
            value,
            range,
            last_updated: at,
            err_msg: String::new(),
        }
    }

    pub fn failure(err_msg: String, range: Option<RangeSpec>, at: DateTime<Utc>) -> Self {
        Self {
            value: String::new(),
            range,
            last_updated: at,
            err_msg,
        }
    }

    pub fn is_success(&self) -> bool {
        self.err_msg.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// Provider response body of the latest success, base64 in JSON.
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "raw_bytes")]
    pub raw_value: Vec<u8>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub err_msg: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interval_results: Vec<EvaluationResult>,
}

mod raw_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{EvaluationResult, MetricStatus};
    use crate::definitions::RangeSpec;

    #[test]
    fn empty_status_serializes_compactly() {
        let json = serde_json::to_value(MetricStatus::default()).expect("serialize");
        assert_eq!(json, serde_json::json!({ "lastUpdated": null }));
    }

    #[test]
    fn status_round_trips_through_json() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let status = MetricStatus {
            value: "42".to_string(),
            raw_value: b"42".to_vec(),
            last_updated: Some(at),
            err_msg: String::new(),
            interval_results: vec![
                EvaluationResult::success("42".to_string(), Some(RangeSpec::default()), at),
                EvaluationResult::failure("timeout".to_string(), None, at),
            ],
        };

        let json = serde_json::to_string(&status).expect("serialize");
        assert!(json.contains("\"rawValue\":\"NDI=\""));
        assert!(json.contains("\"intervalResults\""));
        assert!(json.contains("\"errMsg\":\"timeout\""));

        let decoded: MetricStatus = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, status);
        assert!(decoded.interval_results[0].is_success());
        assert!(!decoded.interval_results[1].is_success());
    }

    #[test]
    fn raw_value_rejects_non_base64_input() {
        let error = serde_json::from_str::<MetricStatus>(r#"{"rawValue":"not base64!"}"#)
            .expect_err("invalid base64 should fail");
        assert!(error.is_data());
    }
}
