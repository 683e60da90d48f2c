use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum username length in bytes.
pub const MAX_USERNAME_LEN: usize = 254;

/// Maximum secret length in bytes, bounding the cost of a hash verification.
pub const MAX_SECRET_LEN: usize = 1024;

/// Usernames are opaque, case-sensitive keys: any printable characters
/// except whitespace.
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s\p{Cc}]+$").expect("Invalid username regex pattern"));

/// Validates a username.
///
/// # Examples
///
/// ```rust
/// use bastion_core::validation::validate_username;
///
/// assert!(validate_username("alice@example.com").is_ok());
/// assert!(validate_username("").is_err());
/// assert!(validate_username("alice smith").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::MissingField("username".to_string()));
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(ValidationError::InvalidUsername(
            "Username is too long".to_string(),
        ));
    }

    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUsername(
            "Username contains whitespace or control characters".to_string(),
        ))
    }
}

/// Validates a submitted secret: non-empty and at most [`MAX_SECRET_LEN`] bytes.
pub fn validate_secret(secret: &str) -> Result<(), ValidationError> {
    if secret.is_empty() {
        return Err(ValidationError::MissingField("secret".to_string()));
    }

    if secret.len() > MAX_SECRET_LEN {
        return Err(ValidationError::InvalidSecret(
            "Secret is too long".to_string(),
        ));
    }

    Ok(())
}
