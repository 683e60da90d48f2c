use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors returned by the HTTP surface.
///
/// Unknown users and wrong secrets are indistinguishable here. Internal
/// failures never carry their cause into the response body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many attempts")]
    TooManyAttempts { retry_after_secs: u64 },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    InternalError,
}

impl From<bastion_core::error::AuthError> for ApiError {
    fn from(err: bastion_core::error::AuthError) -> Self {
        use bastion_core::error::AuthError;

        match err {
            AuthError::UnknownUser | AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::TooManyAttempts { retry_after_secs } => {
                ApiError::TooManyAttempts { retry_after_secs }
            }
        }
    }
}

impl From<bastion_core::Error> for ApiError {
    fn from(err: bastion_core::Error) -> Self {
        match err {
            bastion_core::Error::Auth(e) => e.into(),
            bastion_core::Error::Validation(e) => ApiError::BadRequest(e.to_string()),
            e => {
                tracing::error!(error = %e, "Login request failed");
                ApiError::InternalError
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()),
            ApiError::TooManyAttempts { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "Too many attempts".to_string())
            }
            ApiError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "code": status.as_u16()
        }));

        let mut response = (status, body).into_response();
        if let ApiError::TooManyAttempts { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
