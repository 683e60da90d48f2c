use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Alert transport failure: {0}")]
    TransportFailure(String),

    #[error("Alert rejected by receiver with status {0}")]
    Rejected(u16),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AlertError {
    /// Whether retrying the same delivery may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AlertError::TransportFailure(_) | AlertError::Io(_) => true,
            AlertError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            AlertError::Rejected(_) | AlertError::Serialization(_) | AlertError::Config(_) => {
                false
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AlertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AlertError::TransportFailure("broker down".to_string()).is_transient());
        assert!(
            AlertError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk")).is_transient()
        );
        assert!(!AlertError::Rejected(400).is_transient());
        assert!(!AlertError::Config("missing url".to_string()).is_transient());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AlertError::Rejected(403).to_string(),
            "Alert rejected by receiver with status 403"
        );
        assert_eq!(
            AlertError::TransportFailure("timeout".to_string()).to_string(),
            "Alert transport failure: timeout"
        );
    }
}
