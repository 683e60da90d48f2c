//! Breach alert delivery for bastion.
//!
//! A [`BreachEvent`] is produced exactly once when a username crosses the failed
//! login threshold. The [`AlertPublisher`] takes the event off the request path,
//! serializes it and hands it to an [`AlertTransport`] from a background worker,
//! retrying transient failures with exponential backoff.
//!
//! Transports shipped with this crate:
//!
//! - [`LogTransport`]: emits the alert as a structured `tracing` event (development default)
//! - [`FileTransport`]: appends one JSON line per alert to `<output_dir>/<topic>.jsonl`
//! - [`WebhookTransport`]: POSTs the JSON payload to an HTTP endpoint
pub mod config;
pub mod error;
pub mod event;
pub mod publisher;
pub mod retry;
pub mod transport;
pub mod transports;

pub use config::{AlertConfig, TransportConfig};
pub use error::AlertError;
pub use event::{BREACH_MESSAGE, BreachEvent};
pub use publisher::AlertPublisher;
pub use retry::RetryPolicy;
pub use transport::AlertTransport;
pub use transports::{FileTransport, LogTransport, WebhookTransport};

pub mod prelude {
    pub use crate::{
        AlertConfig, AlertError, AlertPublisher, AlertTransport, BreachEvent, FileTransport,
        LogTransport, TransportConfig, WebhookTransport,
    };
}
