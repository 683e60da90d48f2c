use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};

use crate::{AlertError, AlertTransport};

/// Header carrying the topic the alert is addressed to.
pub const TOPIC_HEADER: &str = "X-Bastion-Topic";

/// POSTs the alert payload to an HTTP endpoint.
///
/// Server errors, `429 Too Many Requests` and connection failures are reported
/// as transient so the publisher retries them; other non-success statuses are
/// final.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: Client,
    url: String,
}

impl WebhookTransport {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn builder(url: &str) -> WebhookTransportBuilder {
        WebhookTransportBuilder::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AlertTransport for WebhookTransport {
    async fn send(&self, topic: &str, payload: &[u8]) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(TOPIC_HEADER, topic)
            .body(payload.to_vec())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AlertError::TransportFailure(format!(
                "webhook responded with {status}"
            )));
        }

        Err(AlertError::Rejected(status.as_u16()))
    }
}

pub struct WebhookTransportBuilder {
    url: String,
    timeout: Duration,
}

impl WebhookTransportBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<WebhookTransport, AlertError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(AlertError::Config(format!(
                "webhook url must be http(s): {}",
                self.url
            )));
        }

        let client = Client::builder().timeout(self.timeout).build()?;
        Ok(WebhookTransport::new(client, self.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_rejects_non_http_url() {
        let result = WebhookTransport::builder("kafka://broker:9092").build();
        assert!(matches!(result, Err(AlertError::Config(_))));
    }

    #[test]
    fn test_builder_accepts_https_url() {
        let transport = WebhookTransport::builder("https://alerts.example.com/hook")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        assert_eq!(transport.url(), "https://alerts.example.com/hook");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient() {
        // Port 9 (discard) on localhost is closed in test environments
        let transport = WebhookTransport::builder("http://127.0.0.1:9/hook")
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();

        let err = transport.send("login-attempts", b"{}").await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");
    }
}
