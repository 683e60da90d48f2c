use std::{path::PathBuf, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{AlertError, AlertTransport, FileTransport, LogTransport, WebhookTransport};

/// Topic breach alerts are addressed to unless configured otherwise.
pub const DEFAULT_TOPIC: &str = "login-attempts";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub transport: TransportConfig,
    pub topic: String,
    /// Retries after the first delivery attempt for transient failures.
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Capacity of the in-process queue between request handlers and the worker.
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Log,
    File {
        output_dir: PathBuf,
    },
    Webhook {
        url: String,
        timeout_secs: Option<u64>,
    },
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::Log,
            topic: DEFAULT_TOPIC.to_string(),
            max_retries: 5,
            base_backoff_ms: 200,
            max_backoff_ms: 10_000,
            queue_capacity: 1024,
        }
    }
}

impl AlertConfig {
    pub fn from_env() -> Result<Self, AlertError> {
        let transport = if let Ok(url) = std::env::var("BASTION_ALERT_WEBHOOK") {
            TransportConfig::Webhook {
                url,
                timeout_secs: std::env::var("BASTION_ALERT_WEBHOOK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok()),
            }
        } else if let Ok(output_dir) = std::env::var("BASTION_ALERT_FILE") {
            TransportConfig::File {
                output_dir: PathBuf::from(output_dir),
            }
        } else {
            // Default to logging alerts for development
            TransportConfig::Log
        };

        let defaults = Self::default();

        Ok(Self {
            transport,
            topic: std::env::var("BASTION_ALERT_TOPIC").unwrap_or(defaults.topic),
            max_retries: parse_env("BASTION_ALERT_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            base_backoff_ms: parse_env("BASTION_ALERT_BASE_BACKOFF_MS")?
                .unwrap_or(defaults.base_backoff_ms),
            max_backoff_ms: parse_env("BASTION_ALERT_MAX_BACKOFF_MS")?
                .unwrap_or(defaults.max_backoff_ms),
            queue_capacity: parse_env("BASTION_ALERT_QUEUE_CAPACITY")?
                .unwrap_or(defaults.queue_capacity),
        })
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.base_backoff_ms = base_backoff_ms;
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    pub fn build_transport(&self) -> Result<Arc<dyn AlertTransport>, AlertError> {
        match &self.transport {
            TransportConfig::Log => Ok(Arc::new(LogTransport::new())),
            TransportConfig::File { output_dir } => Ok(Arc::new(FileTransport::new(output_dir)?)),
            TransportConfig::Webhook { url, timeout_secs } => {
                let mut builder = WebhookTransport::builder(url);

                if let Some(secs) = timeout_secs {
                    builder = builder.timeout(Duration::from_secs(*secs));
                }

                Ok(Arc::new(builder.build()?))
            }
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, AlertError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AlertError::Config(format!("{name} has an invalid value: {value}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AlertConfig::default();
        assert_eq!(config.topic, "login-attempts");
        assert_eq!(config.max_retries, 5);
        assert!(matches!(config.transport, TransportConfig::Log));
    }

    #[test]
    fn test_transport_config_serde_tag() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"type":"webhook","url":"https://hooks.example.com","timeout_secs":3}"#)
                .unwrap();
        assert!(matches!(
            config,
            TransportConfig::Webhook { ref url, timeout_secs: Some(3) } if url == "https://hooks.example.com"
        ));

        let config: TransportConfig = serde_json::from_str(r#"{"type":"log"}"#).unwrap();
        assert!(matches!(config, TransportConfig::Log));
    }

    #[test]
    fn test_build_invalid_webhook_transport_fails() {
        let config = AlertConfig::default().with_transport(TransportConfig::Webhook {
            url: "not-a-url".to_string(),
            timeout_secs: None,
        });
        assert!(matches!(
            config.build_transport(),
            Err(AlertError::Config(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = AlertConfig::default()
            .with_topic("security-alerts")
            .with_retries(2, 10, 100);
        assert_eq!(config.topic, "security-alerts");
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.base_backoff_ms, 10);
        assert_eq!(config.max_backoff_ms, 100);
    }
}
