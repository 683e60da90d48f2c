use bastion_alert::AlertError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

/// Why a login was refused.
///
/// `UnknownUser` exists for server-side logging only. Callers outside the core
/// receive `InvalidCredentials` in its place.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unknown user")]
    UnknownUser,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many attempts")]
    TooManyAttempts { retry_after_secs: u64 },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Token verification failed: {0}")]
    Verification(String),

    #[error("Token expired")]
    Expired,
}

impl Error {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_too_many_attempts(&self) -> bool {
        matches!(self, Error::Auth(AuthError::TooManyAttempts { .. }))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_token_error(&self) -> bool {
        matches!(self, Error::Token(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let auth_error = Error::Auth(AuthError::InvalidCredentials);
        assert_eq!(
            auth_error.to_string(),
            "Authentication error: Invalid credentials"
        );

        let throttled = Error::Auth(AuthError::TooManyAttempts {
            retry_after_secs: 900,
        });
        assert_eq!(throttled.to_string(), "Authentication error: Too many attempts");

        let storage_error = Error::Storage(StorageError::NotFound);
        assert_eq!(storage_error.to_string(), "Storage error: Record not found");

        let validation_error =
            Error::Validation(ValidationError::InvalidUsername("contains whitespace".into()));
        assert_eq!(
            validation_error.to_string(),
            "Validation error: Invalid username: contains whitespace"
        );
    }

    #[test]
    fn test_predicates() {
        assert!(Error::Auth(AuthError::UnknownUser).is_auth_error());
        assert!(!Error::Auth(AuthError::UnknownUser).is_too_many_attempts());
        assert!(
            Error::Auth(AuthError::TooManyAttempts {
                retry_after_secs: 1
            })
            .is_too_many_attempts()
        );
        assert!(Error::Storage(StorageError::Database("down".into())).is_storage_error());
        assert!(Error::Token(TokenError::Expired).is_token_error());
        assert!(!Error::Token(TokenError::Expired).is_auth_error());
        assert!(Error::Validation(ValidationError::MissingField("username".into())).is_validation_error());
    }

    #[test]
    fn test_error_from_conversions() {
        let error: Error = AuthError::InvalidCredentials.into();
        assert!(matches!(error, Error::Auth(AuthError::InvalidCredentials)));

        let error: Error = AlertError::Rejected(400).into();
        assert!(matches!(error, Error::Alert(AlertError::Rejected(400))));
    }
}
