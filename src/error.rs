use std::time::Duration;

use thiserror::Error;

use crate::provider::TransportError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("unsupported aggregation: {0}")]
    UnsupportedAggregation(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("{0}")]
    ProviderQuery(String),
    #[error("provider call timed out after {0:?}")]
    ProviderTimeout(Duration),
}

impl EvaluationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRange(_) => "INVALID_RANGE",
            Self::UnsupportedAggregation(_) => "UNSUPPORTED_AGGREGATION",
            Self::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            Self::ProviderQuery(_) => "PROVIDER_QUERY",
            Self::ProviderTimeout(_) => "PROVIDER_TIMEOUT",
        }
    }

    /// Transient errors clear up on their own; the rest need a definition or config change.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProviderQuery(_) | Self::ProviderTimeout(_))
    }
}

impl From<TransportError> for EvaluationError {
    fn from(error: TransportError) -> Self {
        Self::ProviderQuery(error.to_string())
    }
}
