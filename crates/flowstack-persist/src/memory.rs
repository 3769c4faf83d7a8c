use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::{PipelineRecord, PipelineStore};

/// Process-local pipeline store for development and tests.
#[derive(Default)]
pub struct MemoryPipelineStore {
    records: RwLock<HashMap<String, PipelineRecord>>,
}

impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineStore for MemoryPipelineStore {
    async fn create(&self, name: String, blocks: Value) -> Result<PipelineRecord> {
        let now = Utc::now();
        let record = PipelineRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            blocks,
            created_at: now,
            updated_at: now,
        };

        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<PipelineRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<PipelineRecord>> {
        let mut records: Vec<PipelineRecord> =
            self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    async fn update(&self, id: &str, name: String, blocks: Value) -> Result<PipelineRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| PersistError::PipelineNotFound(id.to_string()))?;

        record.name = name;
        record.blocks = blocks;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.records
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PersistError::PipelineNotFound(id.to_string()))
    }
}
