//! Drives evaluation units on their cadence under a global concurrency cap.
//!
//! Each registered metric gets one [`EvaluationUnit`] and one timer task. Ticks
//! go through a shared [`DispatchQueue`](dispatch::DispatchQueue): they run at
//! once while slots are free, wait in a bounded due-time ordered queue when the
//! cap is reached, and are rejected with [`SchedulerError::Overload`] when that
//! queue is full.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::EngineConfig;
use crate::definitions::{DefinitionEvent, MetricDefinition};
use crate::evaluation::{EvaluationUnit, MetricStatus};
use crate::provider::ProviderGateway;
use crate::status_store::StatusStore;

mod dispatch;
mod timer;


use dispatch::{Admission, DispatchQueue};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("metric {0} is already registered")]
    AlreadyRegistered(String),
    #[error("metric {0} is not registered")]
    NotRegistered(String),
    #[error("invalid definition for {id}: {reason}")]
    InvalidDefinition { id: String, reason: String },
    #[error("evaluation capacity exhausted: {in_flight} running, {queued} queued")]
    Overload { in_flight: usize, queued: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub max_concurrent_evaluations: usize,
    pub ready_queue_capacity: usize,
    pub default_stored_results: u8,
}

impl SchedulerSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_concurrent_evaluations: config.max_concurrent_evaluations,
            ready_queue_capacity: config.ready_queue_capacity,
            default_stored_results: config.default_stored_results,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

struct UnitHandle {
    unit: Arc<EvaluationUnit>,
    cadence: watch::Sender<Duration>,
    timer: JoinHandle<()>,
}

struct Shared {
    settings: SchedulerSettings,
    gateway: ProviderGateway,
    store: Arc<dyn StatusStore>,
    units: RwLock<HashMap<String, UnitHandle>>,
    dispatch: Mutex<DispatchQueue>,
}

#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    pub fn new(
        settings: SchedulerSettings,
        gateway: ProviderGateway,
        store: Arc<dyn StatusStore>,
    ) -> Self {
        let dispatch = DispatchQueue::new(
            settings.max_concurrent_evaluations,
            settings.ready_queue_capacity,
        );

        Self {
            shared: Arc::new(Shared {
                settings,
                gateway,
                store,
                units: RwLock::new(HashMap::new()),
                dispatch: Mutex::new(dispatch),
            }),
        }
    }

    pub async fn register(&self, definition: MetricDefinition) -> Result<(), SchedulerError> {
        validate_definition(&definition.name, &definition)?;
        let id = definition.name.clone();

        if self.shared.units.read().await.contains_key(&id) {
            return Err(SchedulerError::AlreadyRegistered(id));
        }

        let restored = match self.shared.store.read_status(&id).await {
            Ok(status) => status,
            Err(error) => {
                log::warn!("status_restore_failed id={} error={}", id, error);
                None
            }
        };

        let mut units = self.shared.units.write().await;
        if units.contains_key(&id) {
            return Err(SchedulerError::AlreadyRegistered(id));
        }

        let cadence = definition.cadence();
        let provider = definition.provider.name.clone();
        let unit = Arc::new(EvaluationUnit::new(
            definition,
            self.shared.settings.default_stored_results,
            restored,
        ));
        let (cadence_tx, cadence_rx) = watch::channel(cadence);
        let timer = timer::spawn_timer(self.clone(), id.clone(), unit.cancellation(), cadence_rx);

        units.insert(
            id.clone(),
            UnitHandle {
                unit,
                cadence: cadence_tx,
                timer,
            },
        );

        log::info!(
            "metric_registered id={} provider={} interval_secs={}",
            id,
            provider,
            cadence.as_secs()
        );
        Ok(())
    }

    /// Reconfigures a live unit in place. History survives; a cadence change
    /// restarts that unit's timer.
    pub async fn update(&self, id: &str, definition: MetricDefinition) -> Result<(), SchedulerError> {
        validate_definition(id, &definition)?;

        let units = self.shared.units.read().await;
        let handle = units
            .get(id)
            .ok_or_else(|| SchedulerError::NotRegistered(id.to_string()))?;

        let previous = handle.unit.definition().await;
        let cadence = definition.cadence();
        let query_changed = previous.query != definition.query;
        handle.unit.reconfigure(definition).await;

        if previous.cadence() != cadence {
            handle.cadence.send_replace(cadence);
        }

        log::info!(
            "metric_updated id={} interval_secs={} query_changed={}",
            id,
            cadence.as_secs(),
            query_changed
        );
        Ok(())
    }

    /// Tears the unit down and removes its persisted status. A provider call
    /// still in flight is cancelled and its result discarded.
    pub async fn unregister(&self, id: &str) -> Result<(), SchedulerError> {
        let handle = {
            let mut units = self.shared.units.write().await;
            let handle = units
                .remove(id)
                .ok_or_else(|| SchedulerError::NotRegistered(id.to_string()))?;
            self.detach(id, &handle).await;
            handle
        };

        self.retire(id, handle).await;

        if let Err(error) = self.shared.store.remove_status(id).await {
            log::warn!("status_remove_failed id={} error={}", id, error);
        }

        log::info!("metric_unregistered id={}", id);
        Ok(())
    }

    /// Applies a change-feed event. Adds of known ids update them, updates of
    /// unknown ids register them, and removals of unknown ids are ignored.
    pub async fn apply(&self, event: DefinitionEvent) -> Result<(), SchedulerError> {
        match event {
            DefinitionEvent::Added(definition) | DefinitionEvent::Updated(definition) => {
                let id = definition.name.clone();
                if self.contains(&id).await {
                    self.update(&id, definition).await
                } else {
                    match self.register(definition.clone()).await {
                        Err(SchedulerError::AlreadyRegistered(_)) => self.update(&id, definition).await,
                        other => other,
                    }
                }
            }
            DefinitionEvent::Removed(id) => match self.unregister(&id).await {
                Err(SchedulerError::NotRegistered(_)) => Ok(()),
                other => other,
            },
        }
    }

    pub async fn status(&self, id: &str) -> Option<MetricStatus> {
        let unit = self.unit(id).await?;
        Some(unit.snapshot().await)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.shared.units.read().await.contains_key(id)
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.shared.units.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.shared.units.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shared.units.read().await.is_empty()
    }

    /// Evaluations currently running and ticks waiting for a slot.
    pub async fn load(&self) -> (usize, usize) {
        let dispatch = self.shared.dispatch.lock().await;
        (dispatch.in_flight(), dispatch.queued())
    }

    /// Stops every unit. Persisted statuses are left in place.
    pub async fn shutdown(&self) {
        let handles: Vec<(String, UnitHandle)> = {
            let mut units = self.shared.units.write().await;
            let handles: Vec<(String, UnitHandle)> = units.drain().collect();
            for (id, handle) in &handles {
                self.detach(id, handle).await;
            }
            handles
        };
        let count = handles.len();

        for (id, handle) in handles {
            self.retire(&id, handle).await;
        }

        log::info!("scheduler_stopped units={}", count);
    }

    /// Stops the unit's timer and drops its waiting tick. Runs under the
    /// registry write lock so a re-registration of `id` starts with a clean queue.
    async fn detach(&self, id: &str, handle: &UnitHandle) {
        handle.unit.cancellation().cancel();
        self.shared.dispatch.lock().await.forget(id);
    }

    async fn retire(&self, id: &str, handle: UnitHandle) {
        handle.unit.retire().await;
        if let Err(error) = handle.timer.await {
            log::warn!("timer_join_failed id={} error={}", id, error);
        }
    }

    async fn unit(&self, id: &str) -> Option<Arc<EvaluationUnit>> {
        self.shared
            .units
            .read()
            .await
            .get(id)
            .map(|handle| Arc::clone(&handle.unit))
    }

    pub(crate) async fn submit(&self, id: &str) -> Result<(), SchedulerError> {
        let admission = self.shared.dispatch.lock().await.admit(id, Instant::now());

        match admission {
            Admission::Run => {
                self.spawn_slot(id.to_string());
                Ok(())
            }
            Admission::Queued => {
                log::debug!("tick_queued id={}", id);
                Ok(())
            }
            Admission::Busy => {
                log::debug!("tick_skipped id={} reason=in_flight", id);
                Ok(())
            }
            Admission::Coalesced => {
                log::debug!("tick_coalesced id={}", id);
                Ok(())
            }
            Admission::Rejected { in_flight, queued } => {
                Err(SchedulerError::Overload { in_flight, queued })
            }
        }
    }

    /// Runs the admitted cycle, then keeps the slot busy with queued ticks until none remain.
    fn spawn_slot(&self, id: String) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut next = Some(id);
            while let Some(id) = next {
                if let Some(unit) = scheduler.unit(&id).await {
                    unit.evaluate(&scheduler.shared.gateway, scheduler.shared.store.as_ref())
                        .await;
                }
                next = scheduler.shared.dispatch.lock().await.release(&id);
            }
        });
    }
}

fn validate_definition(id: &str, definition: &MetricDefinition) -> Result<(), SchedulerError> {
    let invalid = |reason: String| SchedulerError::InvalidDefinition {
        id: id.to_string(),
        reason,
    };

    definition.validate().map_err(invalid)?;
    if definition.name != id {
        return Err(invalid(format!(
            "definition name {} does not match id {}",
            definition.name, id
        )));
    }
    Ok(())
}
