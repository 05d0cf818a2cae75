use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::evaluation::MetricStatus;

mod sled_store;

#[cfg(test)]
mod tests;

pub use sled_store::SledStatusStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("status store error: {0}")]
    Sled(#[from] sled::Error),
    #[error("status encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Write side of metric status persistence, keyed by metric id.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn read_status(&self, id: &str) -> Result<Option<MetricStatus>, StoreError>;

    async fn write_status(&self, id: &str, status: &MetricStatus) -> Result<(), StoreError>;

    async fn remove_status(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    entries: Mutex<HashMap<String, MetricStatus>>,
    writes: Mutex<usize>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<MetricStatus> {
        self.entries.lock().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Number of `write_status` calls so far, including overwrites.
    pub async fn write_count(&self) -> usize {
        *self.writes.lock().await
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn read_status(&self, id: &str) -> Result<Option<MetricStatus>, StoreError> {
        Ok(self.get(id).await)
    }

    async fn write_status(&self, id: &str, status: &MetricStatus) -> Result<(), StoreError> {
        self.entries
            .lock()
            .await
            .insert(id.to_string(), status.clone());
        *self.writes.lock().await += 1;
        Ok(())
    }

    async fn remove_status(&self, id: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(id);
        Ok(())
    }
}
