//! Analysis result cache keyed by (text, publisher, language).
//!
//! Caching is an optimization only. Storage failures are logged and read as
//! misses, and expired entries are dropped when they are next read.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::store::{CacheRecord, CacheStore, StoreResult};

/// Source of the current time, injected so expiry can be tested
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Age limit of `hours`, saturating at the largest representable span
pub fn hours(hours: u64) -> Duration {
    i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .unwrap_or(Duration::MAX)
}

/// Derive the cache key for one analysis request.
///
/// Text and publisher are hashed byte for byte; the language code is
/// trimmed and lowercased. Each part is length-prefixed so that moving bytes
/// between parts changes the key.
pub fn cache_key(text: &str, publisher: &str, language: &str) -> String {
    let language = language.trim().to_lowercase();
    let mut hasher = Sha256::new();
    for part in [text, publisher, language.as_str()] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
}

pub struct AnalysisCache {
    store: Arc<dyn CacheStore>,
    expiry: Duration,
    clock: Arc<dyn Clock>,
}

impl AnalysisCache {
    pub fn new(store: Arc<dyn CacheStore>, expiry: Duration) -> Self {
        Self::with_clock(store, expiry, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn CacheStore>, expiry: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            expiry,
            clock,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Cached payload for this request, if present and not older than the expiry
    pub fn get(&self, text: &str, publisher: &str, language: &str) -> Option<serde_json::Value> {
        let key = cache_key(text, publisher, language);

        let record = match self.store.get(&key) {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("Cache miss for {} ({})", publisher, language);
                return None;
            }
            Err(e) => {
                warn!("Cache read failed, treating as miss: {}", e);
                return None;
            }
        };

        if self.clock.now().signed_duration_since(record.created_at) > self.expiry {
            debug!(
                "Cache entry for {} expired (created {})",
                publisher, record.created_at
            );
            if let Err(e) = self.store.remove(&key) {
                warn!("Failed to remove expired cache entry: {}", e);
            }
            return None;
        }

        debug!("Cache hit for {} ({})", publisher, language);
        Some(record.payload)
    }

    /// Store a payload; failures are logged, never returned
    pub fn put(&self, text: &str, publisher: &str, language: &str, payload: &serde_json::Value) {
        let record = CacheRecord {
            key: cache_key(text, publisher, language),
            publisher: publisher.to_string(),
            language: language.to_string(),
            payload: payload.clone(),
            created_at: self.clock.now(),
        };

        match self.store.put(&record) {
            Ok(()) => debug!("Cached analysis for {} ({})", publisher, language),
            Err(e) => warn!("Cache write failed for {}: {}", publisher, e),
        }
    }

    /// Remove every entry older than `max_age`
    pub fn clear_expired(&self, max_age: Duration) -> StoreResult<usize> {
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.store.evict_expired(cutoff)
    }

    pub fn stats(&self) -> StoreResult<CacheStats> {
        Ok(CacheStats {
            entries: self.store.count()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::store::{MemoryCacheStore, SqliteCacheStore, StorageError};

    /// Clock that only moves when told to
    #[derive(Debug)]
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        fn advance(&self, by: Duration) {
            if let Ok(mut now) = self.now.lock() {
                *now += by;
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
        }
    }

    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn get(&self, _key: &str) -> StoreResult<Option<CacheRecord>> {
            Err(StorageError::Lock("disk unplugged".into()))
        }
        fn put(&self, _record: &CacheRecord) -> StoreResult<()> {
            Err(StorageError::Lock("disk unplugged".into()))
        }
        fn remove(&self, _key: &str) -> StoreResult<bool> {
            Err(StorageError::Lock("disk unplugged".into()))
        }
        fn evict_expired(&self, _cutoff: DateTime<Utc>) -> StoreResult<usize> {
            Err(StorageError::Lock("disk unplugged".into()))
        }
        fn count(&self) -> StoreResult<usize> {
            Err(StorageError::Lock("disk unplugged".into()))
        }
    }

    fn cache_with_clock() -> (AnalysisCache, Arc<ManualClock>, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = AnalysisCache::with_clock(store.clone(), Duration::hours(24), clock.clone());
        (cache, clock, store)
    }

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(
            cache_key("Subscribe now", "Daily", "en"),
            cache_key("Subscribe now", "Daily", "en")
        );
        assert_eq!(cache_key("a", "b", "c").len(), 64);
    }

    #[test]
    fn test_key_sensitive_to_every_part() {
        let base = cache_key("Subscribe now", "Daily", "en");
        assert_ne!(base, cache_key("Subscribe now!", "Daily", "en"));
        assert_ne!(base, cache_key("subscribe now", "Daily", "en"));
        assert_ne!(base, cache_key("Subscribe now", "Weekly", "en"));
        assert_ne!(base, cache_key("Subscribe now", "Daily", "cs"));
    }

    #[test]
    fn test_key_parts_do_not_run_together() {
        assert_ne!(cache_key("ab", "c", "en"), cache_key("a", "bc", "en"));
    }

    #[test]
    fn test_language_code_normalized() {
        assert_eq!(
            cache_key("text", "Daily", " EN "),
            cache_key("text", "Daily", "en")
        );
    }

    #[test]
    fn test_round_trip_before_expiry() {
        let (cache, clock, _) = cache_with_clock();
        let payload = json!({ "sophistication_score": 7.0 });

        cache.put("page text", "Daily", "en", &payload);
        clock.advance(Duration::hours(23));

        assert_eq!(cache.get("page text", "Daily", "en"), Some(payload));
    }

    #[test]
    fn test_expired_entry_is_absent_and_removed() {
        let (cache, clock, store) = cache_with_clock();
        cache.put("page text", "Daily", "en", &json!({ "x": 1 }));

        clock.advance(Duration::hours(25));

        assert_eq!(cache.get("page text", "Daily", "en"), None);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_different_request_misses() {
        let (cache, _, _) = cache_with_clock();
        cache.put("page text", "Daily", "en", &json!({ "x": 1 }));
        assert_eq!(cache.get("page text", "Daily", "de"), None);
    }

    #[test]
    fn test_storage_failure_degrades_to_miss() {
        let cache = AnalysisCache::new(Arc::new(BrokenStore), Duration::hours(24));
        cache.put("text", "Daily", "en", &json!({ "x": 1 }));
        assert_eq!(cache.get("text", "Daily", "en"), None);
        assert!(cache.stats().is_err());
    }

    #[test]
    fn test_clear_expired_and_stats() {
        let (cache, clock, _) = cache_with_clock();
        cache.put("old", "Daily", "en", &json!(1));
        clock.advance(Duration::hours(30));
        cache.put("new", "Daily", "en", &json!(2));

        assert_eq!(cache.stats().unwrap().entries, 2);
        assert_eq!(cache.clear_expired(Duration::hours(24)).unwrap(), 1);
        assert_eq!(cache.stats().unwrap().entries, 1);
    }

    #[test]
    fn test_concurrent_puts_with_sqlite_store() {
        let store = Arc::new(SqliteCacheStore::in_memory().unwrap());
        let cache = Arc::new(AnalysisCache::new(store, Duration::hours(24)));

        let handles: Vec<_> = ["Alpha", "Beta", "Gamma", "Delta"]
            .into_iter()
            .map(|publisher| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    cache.put("same text", publisher, "en", &json!({ "publisher": publisher }));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for publisher in ["Alpha", "Beta", "Gamma", "Delta"] {
            assert_eq!(
                cache.get("same text", publisher, "en"),
                Some(json!({ "publisher": publisher }))
            );
        }
    }

    #[test]
    fn test_hours_saturates() {
        assert_eq!(hours(24), Duration::hours(24));
        assert_eq!(hours(u64::MAX), Duration::MAX);
        assert_eq!(hours(i64::MAX as u64), Duration::MAX);
    }

    #[test]
    fn test_clear_with_huge_age_removes_nothing() {
        let (cache, _, _) = cache_with_clock();
        cache.put("text", "Daily", "en", &json!(1));

        assert_eq!(cache.clear_expired(hours(u64::MAX)).unwrap(), 0);
        assert_eq!(cache.stats().unwrap().entries, 1);
    }

    #[test]
    fn test_huge_expiry_never_expires() {
        let store = Arc::new(MemoryCacheStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = AnalysisCache::with_clock(store, hours(u64::MAX), clock.clone());

        cache.put("text", "Daily", "en", &json!(1));
        clock.advance(Duration::days(365 * 50));
        assert_eq!(cache.get("text", "Daily", "en"), Some(json!(1)));
    }
}
