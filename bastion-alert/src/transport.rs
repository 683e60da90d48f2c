use async_trait::async_trait;

use crate::AlertError;

/// Delivers a serialized alert to a named topic or channel.
///
/// Implementations report failures through [`AlertError`]; the publisher
/// decides whether to retry based on [`AlertError::is_transient`].
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn send(&self, topic: &str, payload: &[u8]) -> Result<(), AlertError>;
}
