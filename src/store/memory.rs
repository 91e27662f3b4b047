use super::EntityStore;
use crate::models::Entity;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Natural-key map held in process memory.
pub struct MemoryStore<T> {
    records: Mutex<FxHashMap<String, T>>,
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(FxHashMap::default()),
        }
    }

    /// Counts stored records, reading through a poisoned lock.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for MemoryStore<T> {
    async fn save_all(&self, records: Vec<T>) -> Result<()> {
        let mut map = self
            .records
            .lock()
            .map_err(|_| anyhow!("{} store lock poisoned", T::LABEL))?;
        let count = records.len();
        for record in records {
            map.insert(record.id().to_string(), record);
        }
        debug!(label = T::LABEL, count, total = map.len(), "Records saved");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        let map = self
            .records
            .lock()
            .map_err(|_| anyhow!("{} store lock poisoned", T::LABEL))?;
        Ok(map.get(id).cloned())
    }
}
