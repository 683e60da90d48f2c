//! Per-username failure tracking record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Consecutive failed login attempts for one username.
///
/// Created on the first failure, incremented on each further failure, and
/// deleted on a successful login or when it has been idle longer than the
/// store's TTL. Only an [`AttemptStore`](crate::AttemptStore) mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Case-sensitive key.
    pub username: String,
    pub failure_count: u32,
    pub last_updated: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(username: impl Into<String>, failure_count: u32, last_updated: DateTime<Utc>) -> Self {
        Self {
            username: username.into(),
            failure_count,
            last_updated,
        }
    }

    /// Whether the record has been idle for longer than `ttl` at `now`.
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.last_updated + ttl <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let record = AttemptRecord::new("alice", 2, now - Duration::minutes(10));

        assert!(!record.is_expired(Duration::minutes(15), now));
        assert!(record.is_expired(Duration::minutes(10), now));
        assert!(record.is_expired(Duration::minutes(5), now));
    }
}
