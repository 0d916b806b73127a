pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("store lock poisoned: {0}")]
    Lock(String),

    #[error("corrupt payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StorageError>;

/// One cached analysis, with the (publisher, language) pair kept for debugging
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub key: String,
    pub publisher: String,
    pub language: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Keyed record storage behind the analysis cache.
///
/// Writes are point upserts on independent keys, last write wins.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<CacheRecord>>;
    fn put(&self, record: &CacheRecord) -> StoreResult<()>;
    /// Returns whether a record was removed
    fn remove(&self, key: &str) -> StoreResult<bool>;
    /// Remove every record created before `cutoff`, returning how many went
    fn evict_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;
    fn count(&self) -> StoreResult<usize>;
}
