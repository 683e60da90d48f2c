//! SQLite implementation of the attempt store.
//!
//! The increment is a single `INSERT .. ON CONFLICT DO UPDATE .. RETURNING`
//! statement, so SQLite's write lock makes each read-modify-write atomic
//! across connections and processes sharing the database file.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use bastion_core::{AttemptRecord, AttemptStore, Error, error::StorageError};

/// SQLite-backed [`AttemptStore`].
pub struct SqliteAttemptStore {
    pool: SqlitePool,
    ttl: Duration,
}

impl SqliteAttemptStore {
    pub fn new(pool: SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Millisecond timestamp at or before which a record is expired.
    fn cutoff(&self, now: DateTime<Utc>) -> i64 {
        (now - self.ttl).timestamp_millis()
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteAttemptRecord {
    username: String,
    failure_count: i64,
    last_updated: i64,
}

impl TryFrom<SqliteAttemptRecord> for AttemptRecord {
    type Error = Error;

    fn try_from(row: SqliteAttemptRecord) -> Result<Self, Self::Error> {
        let last_updated = DateTime::from_timestamp_millis(row.last_updated).ok_or_else(|| {
            StorageError::Database(format!("Invalid timestamp {}", row.last_updated))
        })?;

        Ok(AttemptRecord::new(
            row.username,
            to_count(row.failure_count),
            last_updated,
        ))
    }
}

fn to_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[async_trait]
impl AttemptStore for SqliteAttemptStore {
    async fn get(&self, username: &str) -> Result<Option<AttemptRecord>, Error> {
        let row = sqlx::query_as::<_, SqliteAttemptRecord>(
            r#"
            SELECT username, failure_count, last_updated
            FROM login_attempts
            WHERE username = ? AND last_updated > ?
            "#,
        )
        .bind(username)
        .bind(self.cutoff(Utc::now()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get login attempts");
            StorageError::Database("Failed to get login attempts".to_string())
        })?;

        row.map(AttemptRecord::try_from).transpose()
    }

    async fn increment(&self, username: &str) -> Result<u32, Error> {
        let now = Utc::now();

        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO login_attempts (username, failure_count, last_updated)
            VALUES (?, 1, ?)
            ON CONFLICT(username) DO UPDATE SET
                failure_count = CASE
                    WHEN login_attempts.last_updated <= ? THEN 1
                    ELSE login_attempts.failure_count + 1
                END,
                last_updated = excluded.last_updated
            RETURNING failure_count
            "#,
        )
        .bind(username)
        .bind(now.timestamp_millis())
        .bind(self.cutoff(now))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record failed login attempt");
            StorageError::Database("Failed to record failed login attempt".to_string())
        })?;

        Ok(to_count(count))
    }

    async fn clear(&self, username: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM login_attempts WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to clear login attempts");
                StorageError::Database("Failed to clear login attempts".to_string())
            })?;

        Ok(())
    }

    async fn clear_if_unchanged(&self, seen: &AttemptRecord) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM login_attempts
            WHERE username = ? AND failure_count = ? AND last_updated = ?
            "#,
        )
        .bind(&seen.username)
        .bind(i64::from(seen.failure_count))
        .bind(seen.last_updated.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to reset login attempts");
            StorageError::Database("Failed to reset login attempts".to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn sweep_expired(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE last_updated < ?")
            .bind(before.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to sweep login attempts");
                StorageError::Database("Failed to sweep login attempts".to_string())
            })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::SqliteStorage;

    async fn store(ttl: Duration) -> SqliteAttemptStore {
        let storage = SqliteStorage::connect("sqlite::memory:").await.unwrap();
        storage.migrate().await.unwrap();
        storage.attempt_store(ttl)
    }

    #[tokio::test]
    async fn test_increment_get_clear() {
        let store = store(Duration::minutes(15)).await;

        assert_eq!(store.get("alice").await.unwrap(), None);
        assert_eq!(store.increment("alice").await.unwrap(), 1);
        assert_eq!(store.increment("alice").await.unwrap(), 2);
        assert_eq!(store.increment("alice").await.unwrap(), 3);

        let record = store.get("alice").await.unwrap().unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(record.failure_count, 3);
        assert!(record.last_updated <= Utc::now());

        store.clear("alice").await.unwrap();
        store.clear("alice").await.unwrap();
        assert_eq!(store.get("alice").await.unwrap(), None);
        assert_eq!(store.increment("alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_if_unchanged_keeps_newer_failures() {
        let store = store(Duration::minutes(15)).await;

        store.increment("alice").await.unwrap();
        store.increment("alice").await.unwrap();
        let seen = store.get("alice").await.unwrap().unwrap();

        store.increment("alice").await.unwrap();
        assert!(!store.clear_if_unchanged(&seen).await.unwrap());
        assert_eq!(store.get("alice").await.unwrap().unwrap().failure_count, 3);

        let seen = store.get("alice").await.unwrap().unwrap();
        assert!(store.clear_if_unchanged(&seen).await.unwrap());
        assert_eq!(store.get("alice").await.unwrap(), None);
        assert!(!store.clear_if_unchanged(&seen).await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_are_case_sensitive() {
        let store = store(Duration::minutes(15)).await;

        store.increment("alice").await.unwrap();
        assert_eq!(store.increment("ALICE").await.unwrap(), 1);
        assert_eq!(store.increment("alice").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_expired_record_restarts() {
        let store = store(Duration::milliseconds(50)).await;

        store.increment("bob").await.unwrap();
        store.increment("bob").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        assert_eq!(store.get("bob").await.unwrap(), None);
        assert_eq!(store.increment("bob").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let store = store(Duration::minutes(15)).await;

        store.increment("old").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let cutoff = Utc::now();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        store.increment("new").await.unwrap();

        assert_eq!(store.sweep_expired(cutoff).await.unwrap(), 1);
        assert_eq!(store.get("old").await.unwrap(), None);
        assert!(store.get("new").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let path = std::env::temp_dir().join(format!(
            "bastion-attempts-{}.db",
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let storage = SqliteStorage::connect(&url).await.unwrap();
        storage.migrate().await.unwrap();
        let store = Arc::new(storage.attempt_store(Duration::minutes(15)));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment("carol").await.unwrap() })
            })
            .collect();

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();

        assert_eq!(seen, (1..=50).collect::<Vec<u32>>());
        assert_eq!(store.get("carol").await.unwrap().unwrap().failure_count, 50);

        storage.pool().close().await;
        let _ = std::fs::remove_file(&path);
    }
}
