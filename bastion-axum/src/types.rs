use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(alias = "password")]
    pub secret: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// How clients encode the `secret` field of a login request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretEncoding {
    #[default]
    Plain,
    /// Standard base64 of the UTF-8 secret.
    Base64,
}

impl SecretEncoding {
    pub fn decode(&self, raw: &str) -> Result<String, ApiError> {
        match self {
            SecretEncoding::Plain => Ok(raw.to_string()),
            SecretEncoding::Base64 => {
                let bytes = STANDARD
                    .decode(raw)
                    .map_err(|_| ApiError::BadRequest("Secret is not valid base64".to_string()))?;
                String::from_utf8(bytes)
                    .map_err(|_| ApiError::BadRequest("Secret is not valid UTF-8".to_string()))
            }
        }
    }
}

impl FromStr for SecretEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(SecretEncoding::Plain),
            "base64" => Ok(SecretEncoding::Base64),
            other => Err(format!("Unknown secret encoding: {other}")),
        }
    }
}
