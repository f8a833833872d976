// # Memory Object Store
//
// In-memory implementation of ObjectStore.
//
// Records live in insertion order in a Vec guarded by a RwLock. Nothing
// survives a restart; useful for tests and throwaway deployments.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::traits::object_store::{ObjectRecord, ObjectStore, match_id};

/// In-memory object store
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<RwLock<Vec<ObjectRecord>>>,
}

impl MemoryObjectStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, record: &ObjectRecord) -> Result<()> {
        let mut records = self.inner.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<ObjectRecord> {
        let records = self.inner.read().await;
        let matched = match_id(records.iter().map(|r| r.id.as_str()), id)
            .ok_or_else(|| Error::not_found(format!("Object not found: {}", id)))?;

        records
            .iter()
            .find(|r| r.id == matched)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Object not found: {}", id)))
    }

    async fn list(&self) -> Result<Vec<ObjectRecord>> {
        Ok(self.inner.read().await.clone())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.inner.write().await.retain(|r| r.id != id);
        Ok(())
    }

    fn reference(&self, id: &str) -> String {
        format!("{}.json", id)
    }
}
