use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::store::{CacheRecord, CacheStore, StorageError, StoreResult};

/// Process-local store; used when the on-disk cache is disabled and in tests
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    records: RwLock<HashMap<String, CacheRecord>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Lock(e.to_string())
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> StoreResult<Option<CacheRecord>> {
        Ok(self.records.read().map_err(poisoned)?.get(key).cloned())
    }

    fn put(&self, record: &CacheRecord) -> StoreResult<()> {
        self.records
            .write()
            .map_err(poisoned)?
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        Ok(self.records.write().map_err(poisoned)?.remove(key).is_some())
    }

    fn evict_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut records = self.records.write().map_err(poisoned)?;
        let before = records.len();
        records.retain(|_, record| record.created_at >= cutoff);
        Ok(before - records.len())
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.records.read().map_err(poisoned)?.len())
    }
}
