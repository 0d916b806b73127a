use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::store::{CacheRecord, CacheStore, StorageError, StoreResult};

pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Fixed-width UTC form so that text comparison matches time order
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &str) -> StoreResult<Option<CacheRecord>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT key, publisher, language, payload, created_at
                 FROM cache_entries WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((key, publisher, language, payload, created_at)) = row else {
            return Ok(None);
        };

        // An unreadable timestamp is treated as infinitely old
        let created_at = Self::parse_datetime(&created_at).unwrap_or(DateTime::UNIX_EPOCH);

        Ok(Some(CacheRecord {
            key,
            publisher,
            language,
            payload: serde_json::from_str(&payload)?,
            created_at,
        }))
    }

    fn put(&self, record: &CacheRecord) -> StoreResult<()> {
        let payload = serde_json::to_string(&record.payload)?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO cache_entries (key, publisher, language, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
                publisher = excluded.publisher,
                language = excluded.language,
                payload = excluded.payload,
                created_at = excluded.created_at",
            params![
                record.key,
                record.publisher,
                record.language,
                payload,
                Self::format_datetime(&record.created_at),
            ],
        )?;

        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn evict_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE created_at < ?1",
            params![Self::format_datetime(&cutoff)],
        )?;
        Ok(removed)
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn record(key: &str, created_at: DateTime<Utc>) -> CacheRecord {
        CacheRecord {
            key: key.to_string(),
            publisher: "The Daily".to_string(),
            language: "en".to_string(),
            payload: json!({ "sophistication_score": 6.5, "primary_strategy": "hybrid" }),
            created_at,
        }
    }

    #[test]
    fn test_put_and_get() {
        let store = SqliteCacheStore::in_memory().unwrap();
        let rec = record("k1", Utc::now());
        store.put(&rec).unwrap();

        let loaded = store.get("k1").unwrap().unwrap();
        assert_eq!(loaded.payload, rec.payload);
        assert_eq!(loaded.publisher, "The Daily");
        assert_eq!(
            loaded.created_at.timestamp_micros(),
            rec.created_at.timestamp_micros()
        );
    }

    #[test]
    fn test_get_missing() {
        let store = SqliteCacheStore::in_memory().unwrap();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites_same_key() {
        let store = SqliteCacheStore::in_memory().unwrap();
        store.put(&record("k1", Utc::now())).unwrap();

        let mut newer = record("k1", Utc::now());
        newer.payload = json!({ "primary_strategy": "mission-driven" });
        store.put(&newer).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get("k1").unwrap().unwrap().payload, newer.payload);
    }

    #[test]
    fn test_remove() {
        let store = SqliteCacheStore::in_memory().unwrap();
        store.put(&record("k1", Utc::now())).unwrap();
        assert!(store.remove("k1").unwrap());
        assert!(!store.remove("k1").unwrap());
        assert!(store.get("k1").unwrap().is_none());
    }

    #[test]
    fn test_evict_expired() {
        let store = SqliteCacheStore::in_memory().unwrap();
        let now = Utc::now();
        store.put(&record("old", now - Duration::hours(48))).unwrap();
        store.put(&record("fresh", now - Duration::hours(1))).unwrap();

        let removed = store.evict_expired(now - Duration::hours(24)).unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("old").unwrap().is_none());
        assert!(store.get("fresh").unwrap().is_some());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = SqliteCacheStore::new(&path).unwrap();
            store.put(&record("k1", Utc::now())).unwrap();
        }

        let reopened = SqliteCacheStore::new(&path).unwrap();
        assert!(reopened.get("k1").unwrap().is_some());
    }

    #[test]
    fn test_concurrent_puts_on_different_keys() {
        let store = Arc::new(SqliteCacheStore::in_memory().unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let mut rec = record(&format!("key-{i}"), Utc::now());
                    rec.payload = json!({ "n": i });
                    store.put(&rec).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..8 {
            let loaded = store.get(&format!("key-{i}")).unwrap().unwrap();
            assert_eq!(loaded.payload, json!({ "n": i }));
        }
    }
}
