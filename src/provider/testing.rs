use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::EvaluationError;
use crate::range::ResolvedRange;

use super::{MetricProvider, ProviderReading, QueryTransport, TransportError, TransportRequest};

pub(crate) struct ScriptedTransport {
    bodies: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn returning(body: &str) -> Self {
        Self::sequence(vec![Ok(body.as_bytes().to_vec())])
    }

    pub(crate) fn sequence(bodies: Vec<Result<Vec<u8>, TransportError>>) -> Self {
        Self {
            bodies: Mutex::new(bodies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) fn last_request(&self) -> TransportRequest {
        self.requests()
            .pop()
            .expect("transport should have been called")
    }
}

#[async_trait]
impl QueryTransport for ScriptedTransport {
    async fn get(&self, request: TransportRequest) -> Result<Vec<u8>, TransportError> {
        self.requests.lock().expect("requests lock").push(request.clone());
        self.bodies
            .lock()
            .expect("bodies lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Request {
                    url: request.url,
                    message: "script exhausted".to_string(),
                })
            })
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Value(String),
    /// A value whose response body differs from its text.
    Body(String, Vec<u8>),
    Error(String),
    Slow(Duration, String),
}

impl Scripted {
    pub(crate) fn value(value: &str) -> Self {
        Self::Value(value.to_string())
    }

    pub(crate) fn body(value: &str, raw: Vec<u8>) -> Self {
        Self::Body(value.to_string(), raw)
    }

    pub(crate) fn error(message: &str) -> Self {
        Self::Error(message.to_string())
    }

    pub(crate) fn slow(delay: Duration, value: &str) -> Self {
        Self::Slow(delay, value.to_string())
    }
}

pub(crate) struct ScriptedProvider {
    steps: Mutex<VecDeque<Scripted>>,
    fallback: Scripted,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub(crate) fn always(step: Scripted) -> Self {
        Self::sequence(Vec::new(), step)
    }

    pub(crate) fn sequence(steps: Vec<Scripted>, fallback: Scripted) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries lock").clone()
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetricProvider for ScriptedProvider {
    fn backend(&self) -> &'static str {
        "scripted"
    }

    async fn execute(
        &self,
        query: &str,
        _range: &ResolvedRange,
    ) -> Result<ProviderReading, EvaluationError> {
        let step = {
            let mut steps = self.steps.lock().expect("steps lock");
            steps.pop_front().unwrap_or_else(|| self.fallback.clone())
        };
        self.queries.lock().expect("queries lock").push(query.to_string());
        self.calls.fetch_add(1, Ordering::SeqCst);

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        match step {
            Scripted::Value(value) => Ok(reading(&value)),
            Scripted::Body(value, raw) => Ok(ProviderReading { value, raw }),
            Scripted::Error(message) => Err(EvaluationError::ProviderQuery(message)),
            Scripted::Slow(delay, value) => {
                tokio::time::sleep(delay).await;
                Ok(reading(&value))
            }
        }
    }
}

fn reading(value: &str) -> ProviderReading {
    ProviderReading {
        value: value.to_string(),
        raw: value.as_bytes().to_vec(),
    }
}
