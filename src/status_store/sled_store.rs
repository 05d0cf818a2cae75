use std::path::Path;

use async_trait::async_trait;

use crate::config::Config;
use crate::evaluation::MetricStatus;

use super::{StatusStore, StoreError};

const STATUS_TREE: &str = "metric_status";

#[derive(Clone)]
pub struct SledStatusStore {
    statuses: sled::Tree,
}

impl SledStatusStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        let statuses = db.open_tree(STATUS_TREE)?;
        Ok(Self { statuses })
    }

    pub fn open_from_config(config: &Config) -> Result<Option<Self>, sled::Error> {
        if !config.status_store.enabled {
            return Ok(None);
        }

        Self::open(&config.status_store.path).map(Some)
    }
}

#[async_trait]
impl StatusStore for SledStatusStore {
    async fn read_status(&self, id: &str) -> Result<Option<MetricStatus>, StoreError> {
        let Some(value) = self.statuses.get(id.as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&value)?))
    }

    async fn write_status(&self, id: &str, status: &MetricStatus) -> Result<(), StoreError> {
        let value = serde_json::to_vec(status)?;
        self.statuses.insert(id.as_bytes(), value)?;
        Ok(())
    }

    async fn remove_status(&self, id: &str) -> Result<(), StoreError> {
        self.statuses.remove(id.as_bytes())?;
        Ok(())
    }
}
