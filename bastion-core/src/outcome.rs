//! Inputs and results of a single login attempt.

use chrono::Duration;

use crate::{Principal, error::AuthError};

/// A submitted username and secret. Borrowed for the duration of one
/// verification call and never stored.
#[derive(Clone, Copy)]
pub struct Credential<'a> {
    pub username: &'a str,
    pub secret: &'a str,
}

impl<'a> Credential<'a> {
    pub fn new(username: &'a str, secret: &'a str) -> Self {
        Self { username, secret }
    }
}

impl std::fmt::Debug for Credential<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The directory has no such user. Never leaves the core: the guard
    /// reports it as `InvalidCredentials`.
    UnknownUser,
    InvalidCredentials,
    /// The username is blocked; retry once the cooldown has passed.
    TooManyAttempts { remaining_cooldown: Duration },
}

/// Result of one login attempt. Produced once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The credential matched. The principal carries its granted roles.
    Authenticated(Principal),
    Rejected(RejectReason),
}

impl AuthOutcome {
    pub fn too_many_attempts(remaining_cooldown: Duration) -> Self {
        AuthOutcome::Rejected(RejectReason::TooManyAttempts { remaining_cooldown })
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }

    pub fn is_too_many_attempts(&self) -> bool {
        matches!(
            self,
            AuthOutcome::Rejected(RejectReason::TooManyAttempts { .. })
        )
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthOutcome::Authenticated(principal) => Some(principal),
            AuthOutcome::Rejected(_) => None,
        }
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            AuthOutcome::Authenticated(_) => None,
            AuthOutcome::Rejected(reason) => Some(*reason),
        }
    }

    /// Convert into the principal, or the error a caller should surface.
    ///
    /// `UnknownUser` is collapsed into `InvalidCredentials` here. The retry
    /// hint is rounded up to whole seconds and is at least 1.
    pub fn into_result(self) -> Result<Principal, AuthError> {
        match self {
            AuthOutcome::Authenticated(principal) => Ok(principal),
            AuthOutcome::Rejected(RejectReason::TooManyAttempts { remaining_cooldown }) => {
                let millis = remaining_cooldown.num_milliseconds().max(0);
                let secs = (millis + 999) / 1000;
                Err(AuthError::TooManyAttempts {
                    retry_after_secs: secs.max(1) as u64,
                })
            }
            AuthOutcome::Rejected(_) => Err(AuthError::InvalidCredentials),
        }
    }
}
