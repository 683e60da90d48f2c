use std::sync::Arc;

use crate::{
    AuthOutcome, Credential, Error, PasswordHashMatcher, RejectReason, SecretMatcher,
    UserDirectory,
    crypto::{DUMMY_HASH, constant_time_compare},
};

/// Checks a credential against the user directory.
///
/// Pure verification: it never reads or writes attempt counts. The outcome is
/// one of `Authenticated`, `Rejected(UnknownUser)` or
/// `Rejected(InvalidCredentials)`.
///
/// Every rejection runs the matcher once, against [`DUMMY_HASH`] when there is
/// no stored hash to check, so response time does not reveal which usernames
/// exist.
pub struct CredentialVerifier<D: UserDirectory, M: SecretMatcher = PasswordHashMatcher> {
    directory: Arc<D>,
    matcher: M,
}

impl<D: UserDirectory> CredentialVerifier<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self::with_matcher(directory, PasswordHashMatcher)
    }
}

impl<D: UserDirectory, M: SecretMatcher> CredentialVerifier<D, M> {
    pub fn with_matcher(directory: Arc<D>, matcher: M) -> Self {
        Self { directory, matcher }
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Verify a credential.
    ///
    /// # Errors
    ///
    /// Returns `Err` only when the directory lookup itself fails.
    pub async fn verify(&self, credential: &Credential<'_>) -> Result<AuthOutcome, Error> {
        let Some(user) = self.directory.find_by_username(credential.username).await? else {
            let _ = self.matcher.matches(credential.secret, &DUMMY_HASH);
            tracing::debug!(username = %credential.username, "Login for unknown user");
            return Ok(AuthOutcome::Rejected(RejectReason::UnknownUser));
        };

        let secret_matches = self.matcher.matches(credential.secret, &user.secret_hash);

        // A directory with case-insensitive lookup must not let "Alice" log in as "alice".
        if !constant_time_compare(
            user.principal.username().as_bytes(),
            credential.username.as_bytes(),
        ) {
            tracing::debug!(
                username = %credential.username,
                stored = %user.principal.username(),
                "Directory returned a different username"
            );
            return Ok(AuthOutcome::Rejected(RejectReason::InvalidCredentials));
        }

        if !secret_matches {
            tracing::debug!(username = %credential.username, "Secret did not match");
            return Ok(AuthOutcome::Rejected(RejectReason::InvalidCredentials));
        }

        Ok(AuthOutcome::Authenticated(user.principal))
    }
}
