mod file;
mod log;
pub mod webhook;

pub use file::FileTransport;
pub use log::LogTransport;
pub use webhook::{WebhookTransport, WebhookTransportBuilder};
