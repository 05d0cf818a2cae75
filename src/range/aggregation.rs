use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    P90,
    P95,
    P99,
    Max,
    Min,
    Avg,
    Median,
}

impl Aggregation {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "p90" => Some(Self::P90),
            "p95" => Some(Self::P95),
            "p99" => Some(Self::P99),
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            "avg" => Some(Self::Avg),
            "median" => Some(Self::Median),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P90 => "p90",
            Self::P95 => "p95",
            Self::P99 => "p99",
            Self::Max => "max",
            Self::Min => "min",
            Self::Avg => "avg",
            Self::Median => "median",
        }
    }

    /// Reduces `samples` to one value. NaN samples are ignored; `None` when nothing is left.
    pub fn apply(&self, samples: &[f64]) -> Option<f64> {
        let mut values = samples
            .iter()
            .copied()
            .filter(|value| !value.is_nan())
            .collect::<Vec<_>>();
        if values.is_empty() {
            return None;
        }

        match self {
            Self::Max => values.into_iter().reduce(f64::max),
            Self::Min => values.into_iter().reduce(f64::min),
            Self::Avg => {
                let count = values.len() as f64;
                Some(values.iter().sum::<f64>() / count)
            }
            Self::Median => {
                values.sort_by(f64::total_cmp);
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    Some((values[mid - 1] + values[mid]) / 2.0)
                } else {
                    Some(values[mid])
                }
            }
            Self::P90 => Some(nearest_rank(&mut values, 90.0)),
            Self::P95 => Some(nearest_rank(&mut values, 95.0)),
            Self::P99 => Some(nearest_rank(&mut values, 99.0)),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn nearest_rank(values: &mut [f64], percentile: f64) -> f64 {
    values.sort_by(f64::total_cmp);
    let len = values.len();
    let rank = (percentile * len as f64 / 100.0).ceil() as usize;
    values[rank.clamp(1, len) - 1]
}
