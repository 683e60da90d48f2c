use async_trait::async_trait;

use crate::{AlertError, AlertTransport};

/// Development transport that logs the alert instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

impl LogTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertTransport for LogTransport {
    async fn send(&self, topic: &str, payload: &[u8]) -> Result<(), AlertError> {
        tracing::warn!(
            topic = topic,
            payload = %String::from_utf8_lossy(payload),
            "Breach alert"
        );
        Ok(())
    }
}
