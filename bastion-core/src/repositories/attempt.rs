//! Repository trait for consecutive-failure counting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{AttemptRecord, Error};

/// Per-username counter of consecutive failed logins.
///
/// Every operation on a single key is atomic with respect to every other
/// operation on the same key: two concurrent `increment` calls for one
/// username must return distinct, consecutive values. Operations on
/// different keys are independent.
///
/// Records that have not been updated for the store's TTL are treated as
/// absent. A failed write returns an error; callers must not assume the
/// write happened.
///
/// # Security Considerations
///
/// - Records are kept for every submitted username, including ones that do
///   not exist in the directory, so that lockout cannot be used to enumerate
///   accounts.
/// - `sweep_expired` must use the same cutoff as the TTL check, or an active
///   lockout could be evicted early.
#[async_trait]
pub trait AttemptStore: Send + Sync + 'static {
    /// Get the live record for a username.
    ///
    /// Returns `None` when no record exists or the record has expired.
    async fn get(&self, username: &str) -> Result<Option<AttemptRecord>, Error>;

    /// Atomically add one to the failure count and return the new value.
    ///
    /// A missing or expired record starts from zero, so the first failure
    /// returns 1. Refreshes the record's `last_updated`.
    async fn increment(&self, username: &str) -> Result<u32, Error>;

    /// Reset the failure count for a username. Clearing a missing record is
    /// not an error.
    async fn clear(&self, username: &str) -> Result<(), Error>;

    /// Delete the record only if it still holds the count and timestamp of
    /// `seen`, a record previously returned by [`get`](AttemptStore::get).
    ///
    /// # Returns
    ///
    /// `true` if the record was deleted. `false` if it is gone or has been
    /// updated since `seen` was read.
    async fn clear_if_unchanged(&self, seen: &AttemptRecord) -> Result<bool, Error>;

    /// Delete records last updated before `before`.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    async fn sweep_expired(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
