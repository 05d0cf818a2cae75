use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::EvaluationError;
use crate::range::ResolvedRange;

use super::{MetricProvider, ProviderReading, QueryTransport, build_provider};

/// Named registry of provider backends with a per-call deadline.
#[derive(Clone)]
pub struct ProviderGateway {
    providers: HashMap<String, Arc<dyn MetricProvider>>,
    timeout: Duration,
}

impl ProviderGateway {
    pub fn new(timeout: Duration) -> Self {
        Self {
            providers: HashMap::new(),
            timeout,
        }
    }

    pub fn from_config(
        configs: &[ProviderConfig],
        transport: Arc<dyn QueryTransport>,
        timeout: Duration,
    ) -> Self {
        let mut gateway = Self::new(timeout);
        for config in configs {
            gateway.insert(&config.name, build_provider(config, Arc::clone(&transport)));
            log::info!(
                "provider_registered name={} kind={} target={}",
                config.name,
                config.kind.as_str(),
                config.target
            );
        }
        gateway
    }

    pub fn with_provider(mut self, name: &str, provider: Arc<dyn MetricProvider>) -> Self {
        self.insert(name, provider);
        self
    }

    pub fn insert(&mut self, name: &str, provider: Arc<dyn MetricProvider>) {
        self.providers.insert(name.to_string(), provider);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `query` on the provider registered as `provider_name`.
    ///
    /// An unregistered name fails before anything is sent. The call is
    /// abandoned once the gateway timeout elapses.
    pub async fn execute(
        &self,
        provider_name: &str,
        query: &str,
        range: &ResolvedRange,
    ) -> Result<ProviderReading, EvaluationError> {
        let provider = self
            .providers
            .get(provider_name)
            .ok_or_else(|| EvaluationError::UnknownProvider(provider_name.to_string()))?;

        match tokio::time::timeout(self.timeout, provider.execute(query, range)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "provider_timeout provider={} backend={} timeout_ms={}",
                    provider_name,
                    provider.backend(),
                    self.timeout.as_millis()
                );
                Err(EvaluationError::ProviderTimeout(self.timeout))
            }
        }
    }
}
