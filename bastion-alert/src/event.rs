//! The breach event handed to the alert publisher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AlertError;

/// Message attached to every breach event.
pub const BREACH_MESSAGE: &str = "User reached maximum login attempts";

/// Emitted once when a username's consecutive failure count first reaches the
/// configured threshold.
///
/// The event is immutable once constructed. Its serialized form is:
///
/// ```json
/// {"id":"…","username":"alice","message":"User reached maximum login attempts","attempts":5,"timestamp":1700000000}
/// ```
///
/// `id` is stable across redeliveries so receivers can deduplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreachEvent {
    id: Uuid,
    username: String,
    message: String,
    #[serde(rename = "attempts")]
    attempt_count: u32,
    #[serde(with = "chrono::serde::ts_seconds")]
    timestamp: DateTime<Utc>,
}

impl BreachEvent {
    pub fn new(username: impl Into<String>, attempt_count: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            message: BREACH_MESSAGE.to_string(),
            attempt_count,
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> Result<Vec<u8>, AlertError> {
        Ok(serde_json::to_vec(self)?)
    }
}
