use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::{AttemptRecord, AttemptStore, Error, Principal, StoredUser, UserDirectory};

/// Attempt counts held in a sharded concurrent map.
///
/// Each key is mutated under its shard's write lock, which gives the
/// per-key atomicity [`AttemptStore`] requires without a global lock.
#[derive(Debug)]
pub struct InMemoryAttemptStore {
    records: DashMap<String, AttemptRecord>,
    ttl: Duration,
}

impl InMemoryAttemptStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of records currently held, expired or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryAttemptStore {
    fn default() -> Self {
        Self::new(Duration::minutes(15))
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn get(&self, username: &str) -> Result<Option<AttemptRecord>, Error> {
        let now = Utc::now();
        let record = self.records.get(username).map(|r| r.value().clone());

        match record {
            Some(record) if record.is_expired(self.ttl, now) => {
                self.records
                    .remove_if(username, |_, r| r.is_expired(self.ttl, now));
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn increment(&self, username: &str) -> Result<u32, Error> {
        let now = Utc::now();
        let mut record = self
            .records
            .entry(username.to_string())
            .or_insert_with(|| AttemptRecord::new(username, 0, now));

        if record.is_expired(self.ttl, now) {
            record.failure_count = 0;
        }
        record.failure_count = record.failure_count.saturating_add(1);
        record.last_updated = now;

        Ok(record.failure_count)
    }

    async fn clear(&self, username: &str) -> Result<(), Error> {
        self.records.remove(username);
        Ok(())
    }

    async fn clear_if_unchanged(&self, seen: &AttemptRecord) -> Result<bool, Error> {
        let removed = self.records.remove_if(&seen.username, |_, r| {
            r.failure_count == seen.failure_count && r.last_updated == seen.last_updated
        });
        Ok(removed.is_some())
    }

    async fn sweep_expired(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let mut removed = 0u64;
        self.records.retain(|_, record| {
            let keep = record.last_updated >= before;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

/// Users held in memory, keyed by exact username.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<String, StoredUser>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    pub fn insert(&self, principal: Principal, secret_hash: impl Into<String>) {
        let username = principal.username().to_string();
        self.users
            .insert(username, StoredUser::new(principal, secret_hash));
    }

    pub fn remove(&self, username: &str) -> Option<StoredUser> {
        self.users.remove(username).map(|(_, user)| user)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, Error> {
        Ok(self.users.get(username).map(|u| u.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_increment_counts_from_one() {
        let store = InMemoryAttemptStore::default();

        assert_eq!(store.get("alice").await.unwrap(), None);
        assert_eq!(store.increment("alice").await.unwrap(), 1);
        assert_eq!(store.increment("alice").await.unwrap(), 2);

        let record = store.get("alice").await.unwrap().unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(record.failure_count, 2);
    }

    #[tokio::test]
    async fn test_clear_if_unchanged() {
        let store = InMemoryAttemptStore::default();

        store.increment("alice").await.unwrap();
        let seen = store.get("alice").await.unwrap().unwrap();

        // Another failure lands between the read and the reset
        store.increment("alice").await.unwrap();
        assert!(!store.clear_if_unchanged(&seen).await.unwrap());
        assert_eq!(store.get("alice").await.unwrap().unwrap().failure_count, 2);

        let seen = store.get("alice").await.unwrap().unwrap();
        assert!(store.clear_if_unchanged(&seen).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keys_are_case_sensitive() {
        let store = InMemoryAttemptStore::default();

        store.increment("alice").await.unwrap();
        store.increment("alice").await.unwrap();

        assert_eq!(store.increment("Alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryAttemptStore::default();

        store.increment("bob").await.unwrap();
        store.increment("bob").await.unwrap();
        store.clear("bob").await.unwrap();

        assert_eq!(store.get("bob").await.unwrap(), None);
        assert_eq!(store.increment("bob").await.unwrap(), 1);

        // Clearing a missing key is fine
        store.clear("nobody").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_record_is_absent_and_restarts() {
        let store = InMemoryAttemptStore::new(Duration::milliseconds(50));

        store.increment("carol").await.unwrap();
        store.increment("carol").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        assert_eq!(store.get("carol").await.unwrap(), None);
        assert!(store.is_empty());
        assert_eq!(store.increment("carol").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let store = InMemoryAttemptStore::default();

        store.increment("old").await.unwrap();
        let cutoff = Utc::now() + Duration::milliseconds(1);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.increment("new").await.unwrap();

        assert_eq!(store.sweep_expired(cutoff).await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("new").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryAttemptStore::default());

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment("dave").await.unwrap() })
            })
            .collect();

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();

        assert_eq!(seen, (1..=100).collect::<Vec<u32>>());
        assert_eq!(store.get("dave").await.unwrap().unwrap().failure_count, 100);
    }

    #[tokio::test]
    async fn test_user_directory() {
        let directory = InMemoryUserDirectory::new();
        directory.insert(Principal::new("alice", ["USER"]), "hash");

        let user = directory.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.principal.username(), "alice");
        assert_eq!(user.secret_hash, "hash");

        assert!(directory.find_by_username("ALICE").await.unwrap().is_none());
        assert!(directory.remove("alice").is_some());
        assert!(directory.find_by_username("alice").await.unwrap().is_none());
    }
}
