use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::definitions::MetricDefinition;
use crate::error::EvaluationError;
use crate::provider::{ProviderGateway, ProviderReading};
use crate::range::resolve_range;
use crate::status_store::StatusStore;

use super::history::HistoryRing;
use super::state::{UnitEvent, UnitPhase, transition};
use super::status::{EvaluationResult, MetricStatus};


#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Succeeded(String),
    Failed(EvaluationError),
    /// A cycle was already running, or the unit is retired.
    Skipped,
    /// The unit was retired while the provider call was outstanding.
    Discarded,
}

struct UnitState {
    definition: MetricDefinition,
    phase: UnitPhase,
    value: String,
    raw_value: Vec<u8>,
    last_updated: Option<DateTime<Utc>>,
    err_msg: String,
    history: HistoryRing,
}

impl UnitState {
    fn snapshot(&self) -> MetricStatus {
        MetricStatus {
            value: self.value.clone(),
            raw_value: self.raw_value.clone(),
            last_updated: self.last_updated,
            err_msg: self.err_msg.clone(),
            interval_results: self.history.snapshot(),
        }
    }

    fn advance(&mut self, id: &str, event: UnitEvent) {
        match transition(self.phase, event) {
            Ok(next) => self.phase = next,
            Err(error) => {
                log::warn!("unit_state_reset id={} reason={}", id, error);
                self.phase = UnitPhase::Idle;
            }
        }
    }
}

/// Owns one metric's status and runs its evaluation cycles one at a time.
pub struct EvaluationUnit {
    id: String,
    state: Mutex<UnitState>,
    cancel: CancellationToken,
    default_stored_results: u8,
}

impl EvaluationUnit {
    pub fn new(
        definition: MetricDefinition,
        default_stored_results: u8,
        restored: Option<MetricStatus>,
    ) -> Self {
        let capacity = definition.stored_results(default_stored_results);
        let restored = restored.unwrap_or_default();

        Self {
            id: definition.name.clone(),
            state: Mutex::new(UnitState {
                definition,
                phase: UnitPhase::Idle,
                value: restored.value,
                raw_value: restored.raw_value,
                last_updated: restored.last_updated,
                err_msg: restored.err_msg,
                history: HistoryRing::from_entries(capacity, restored.interval_results),
            }),
            cancel: CancellationToken::new(),
            default_stored_results,
        }
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_retired(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn phase(&self) -> UnitPhase {
        self.state.lock().await.phase
    }

    pub async fn definition(&self) -> MetricDefinition {
        self.state.lock().await.definition.clone()
    }

    pub async fn snapshot(&self) -> MetricStatus {
        self.state.lock().await.snapshot()
    }

    /// Moves the unit to `Evaluating` and hands out the definition for this cycle.
    ///
    /// Returns `None` when a cycle is already in flight or the unit is retired.
    pub async fn begin_cycle(&self) -> Option<MetricDefinition> {
        if self.is_retired() {
            return None;
        }

        let mut state = self.state.lock().await;
        match transition(state.phase, UnitEvent::Tick) {
            Ok(next) => {
                state.phase = next;
                Some(state.definition.clone())
            }
            Err(_) => {
                log::debug!(
                    "tick_skipped id={} reason=in_flight phase={}",
                    self.id,
                    state.phase.as_str()
                );
                None
            }
        }
    }

    /// Runs the provider call for a cycle started by [`Self::begin_cycle`] and records the result.
    pub async fn finish_cycle(
        &self,
        definition: MetricDefinition,
        gateway: &ProviderGateway,
        store: &dyn StatusStore,
    ) -> CycleOutcome {
        let started = Instant::now();
        let evaluated_at = Utc::now();

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                log::debug!("evaluation_discarded id={} reason=retired", self.id);
                return CycleOutcome::Discarded;
            }
            result = query_once(&definition, gateway, evaluated_at) => result,
        };

        let mut state = self.state.lock().await;
        if self.is_retired() {
            log::debug!("evaluation_discarded id={} reason=retired", self.id);
            return CycleOutcome::Discarded;
        }

        // Cap changes apply at write time, using the latest definition.
        let capacity = state.definition.stored_results(self.default_stored_results);
        state.history.set_capacity(capacity);

        let outcome = match result {
            Ok(reading) => {
                // Only the status keeps the raw body; history entries stay small.
                state.history.append(EvaluationResult::success(
                    reading.value.clone(),
                    definition.range.clone(),
                    evaluated_at,
                ));
                state.value = reading.value.clone();
                state.raw_value = reading.raw;
                state.err_msg.clear();
                state.last_updated = Some(evaluated_at);
                state.advance(&self.id, UnitEvent::Succeeded);
                CycleOutcome::Succeeded(reading.value)
            }
            Err(error) => {
                state.history.append(EvaluationResult::failure(
                    error.to_string(),
                    definition.range.clone(),
                    evaluated_at,
                ));
                state.err_msg = error.to_string();
                state.last_updated = Some(evaluated_at);
                state.advance(&self.id, UnitEvent::Failed);
                CycleOutcome::Failed(error)
            }
        };

        let snapshot = state.snapshot();
        if let Err(error) = store.write_status(&self.id, &snapshot).await {
            log::warn!("status_write_failed id={} error={}", self.id, error);
        }
        let settled_from = state.phase;
        state.advance(&self.id, UnitEvent::Settled);
        drop(state);

        let (error_code, transient) = match &outcome {
            CycleOutcome::Failed(error) => (error.code(), error.is_transient()),
            _ => ("", false),
        };
        tracing::info!(
            target: "evaluation",
            metric_id = %self.id,
            provider = %definition.provider.name,
            outcome = settled_from.as_str(),
            error_code,
            transient,
            duration_ms = started.elapsed().as_millis() as u64,
            "metric_evaluated"
        );

        outcome
    }

    /// One full cycle: begin, query, record.
    pub async fn evaluate(&self, gateway: &ProviderGateway, store: &dyn StatusStore) -> CycleOutcome {
        match self.begin_cycle().await {
            Some(definition) => self.finish_cycle(definition, gateway, store).await,
            None => CycleOutcome::Skipped,
        }
    }

    /// Swaps in a new definition. History is kept; an in-flight cycle finishes
    /// under the definition it started with.
    pub async fn reconfigure(&self, definition: MetricDefinition) {
        let mut state = self.state.lock().await;
        state.definition = definition;
    }

    /// Cancels the in-flight provider call and waits until no result can be recorded.
    pub async fn retire(&self) {
        self.cancel.cancel();
        let mut state = self.state.lock().await;
        state.phase = UnitPhase::Idle;
    }
}

async fn query_once(
    definition: &MetricDefinition,
    gateway: &ProviderGateway,
    now: DateTime<Utc>,
) -> Result<ProviderReading, EvaluationError> {
    let range = resolve_range(definition.range.as_ref(), now)?;
    gateway
        .execute(&definition.provider.name, &definition.query, &range)
        .await
}
