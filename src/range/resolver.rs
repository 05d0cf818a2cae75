use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::definitions::{DEFAULT_RANGE_INTERVAL, RangeSpec};
use crate::error::EvaluationError;

use super::{aggregation::Aggregation, duration::parse_duration};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRange {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub step: Option<ChronoDuration>,
    pub aggregation: Option<Aggregation>,
}

impl ResolvedRange {
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self {
            window_start: at,
            window_end: at,
            step: None,
            aggregation: None,
        }
    }

    pub fn is_instant(&self) -> bool {
        self.window_start == self.window_end
    }

    pub fn window(&self) -> ChronoDuration {
        self.window_end - self.window_start
    }
}

pub fn resolve_range(
    spec: Option<&RangeSpec>,
    now: DateTime<Utc>,
) -> Result<ResolvedRange, EvaluationError> {
    let Some(spec) = spec else {
        return Ok(ResolvedRange::instant(now));
    };

    let interval_text = if spec.interval.trim().is_empty() {
        DEFAULT_RANGE_INTERVAL
    } else {
        spec.interval.as_str()
    };
    let interval = parse_positive("interval", interval_text)?;

    let step = match spec.step.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => {
            let step = parse_positive("step", text)?;
            if step > interval {
                return Err(EvaluationError::InvalidRange(format!(
                    "step {} exceeds interval {}",
                    text, interval_text
                )));
            }
            Some(step)
        }
    };

    let aggregation = match spec.aggregation.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => Some(
            Aggregation::parse(text)
                .ok_or_else(|| EvaluationError::UnsupportedAggregation(text.to_string()))?,
        ),
    };

    let window_start = now
        .checked_sub_signed(interval)
        .ok_or_else(|| EvaluationError::InvalidRange(format!("interval {} is too large", interval_text)))?;

    Ok(ResolvedRange {
        window_start,
        window_end: now,
        step,
        aggregation,
    })
}

fn parse_positive(field: &str, text: &str) -> Result<ChronoDuration, EvaluationError> {
    match parse_duration(text) {
        Some(duration) if duration > ChronoDuration::zero() => Ok(duration),
        Some(_) => Err(EvaluationError::InvalidRange(format!(
            "{} {} must be a positive duration",
            field, text
        ))),
        None => Err(EvaluationError::InvalidRange(format!(
            "{} {} is not a valid duration",
            field, text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use super::{ResolvedRange, resolve_range};
    use crate::definitions::RangeSpec;
    use crate::error::EvaluationError;
    use crate::range::Aggregation;

    fn spec(interval: &str, step: Option<&str>, aggregation: Option<&str>) -> RangeSpec {
        RangeSpec {
            interval: interval.to_string(),
            step: step.map(str::to_string),
            aggregation: aggregation.map(str::to_string),
            stored_results: None,
        }
    }

    #[test]
    fn missing_spec_resolves_to_point_in_time_query() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let resolved = resolve_range(None, now).expect("instant range should resolve");
        assert_eq!(resolved, ResolvedRange::instant(now));
        assert!(resolved.is_instant());
        assert!(resolved.aggregation.is_none());
    }

    #[test]
    fn five_minute_avg_window_ends_at_evaluation_time_and_keeps_length_when_shifted() {
        let range = spec("5m", None, Some("avg"));
        let first_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let later_at = first_at + ChronoDuration::seconds(37);

        let first = resolve_range(Some(&range), first_at).expect("range should resolve");
        assert_eq!(first.window_end, first_at);
        assert_eq!(first.window(), ChronoDuration::minutes(5));
        assert_eq!(first.aggregation, Some(Aggregation::Avg));
        assert!(first.step.is_none());

        let later = resolve_range(Some(&range), later_at).expect("range should resolve");
        assert_eq!(later.window_end, later_at);
        assert_eq!(later.window_start - first.window_start, ChronoDuration::seconds(37));
        assert_eq!(later.window(), first.window());
    }

    #[test]
    fn empty_interval_uses_the_default() {
        let now = Utc::now();
        let resolved = resolve_range(Some(&spec("", None, None)), now).expect("range should resolve");
        assert_eq!(resolved.window(), ChronoDuration::minutes(5));
    }

    #[test]
    fn step_must_be_positive_and_within_interval() {
        let now = Utc::now();
        let resolved =
            resolve_range(Some(&spec("10m", Some("1m"), Some("p95"))), now).expect("range should resolve");
        assert_eq!(resolved.step, Some(ChronoDuration::minutes(1)));
        assert_eq!(resolved.aggregation, Some(Aggregation::P95));

        let too_wide = resolve_range(Some(&spec("1m", Some("2m"), None)), now);
        assert!(matches!(too_wide, Err(EvaluationError::InvalidRange(_))));

        let zero_step = resolve_range(Some(&spec("1m", Some("0s"), None)), now);
        assert!(matches!(zero_step, Err(EvaluationError::InvalidRange(_))));
    }

    #[test]
    fn rejects_unparseable_and_zero_intervals() {
        let now = Utc::now();
        for interval in ["five minutes", "0m", "5"] {
            let resolved = resolve_range(Some(&spec(interval, None, None)), now);
            assert!(
                matches!(resolved, Err(EvaluationError::InvalidRange(_))),
                "interval {interval} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_unknown_aggregation() {
        let resolved = resolve_range(Some(&spec("5m", None, Some("sum"))), Utc::now());
        assert_eq!(
            resolved,
            Err(EvaluationError::UnsupportedAggregation("sum".to_string()))
        );
    }
}
