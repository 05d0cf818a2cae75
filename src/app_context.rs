use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::definitions::{MetricDefinition, diff_definitions};
use crate::scheduler::Scheduler;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub applied: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub scheduler: Scheduler,
    pub definitions_path: String,
    applied_definitions: Arc<Mutex<Vec<MetricDefinition>>>,
}

impl AppContext {
    pub fn new(config: Config, scheduler: Scheduler) -> Self {
        let definitions_path = config.definitions_path.clone();
        Self {
            config,
            scheduler,
            definitions_path,
            applied_definitions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn applied_definitions(&self) -> Vec<MetricDefinition> {
        self.applied_definitions.lock().await.clone()
    }

    /// Diffs `next` against the last applied set and feeds the changes to the scheduler.
    ///
    /// Events the scheduler refuses are logged and skipped; the rest still apply.
    pub async fn sync_definitions(&self, next: Vec<MetricDefinition>) -> SyncReport {
        let mut applied = self.applied_definitions.lock().await;
        let events = diff_definitions(&applied, &next);
        let mut report = SyncReport::default();

        for event in events {
            let id = event.id().to_string();
            match self.scheduler.apply(event).await {
                Ok(()) => report.applied += 1,
                Err(error) => {
                    report.failed += 1;
                    log::warn!("definition_apply_failed id={} error={}", id, error);
                }
            }
        }

        *applied = next;
        report
    }
}
