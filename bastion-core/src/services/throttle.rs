//! Per-username login throttling.
//!
//! [`ThrottleGuard`] sits in front of a [`CredentialVerifier`] and keeps a
//! consecutive-failure count per username in an [`AttemptStore`]. Each username
//! moves through three states:
//!
//! - `Clear`: no record
//! - `Accumulating(n)`: `1 <= n < threshold` consecutive failures
//! - `Blocked`: `n >= threshold`, until the lockout period has passed since
//!   the last recorded failure
//!
//! A blocked username is rejected without running verification. The failure
//! that moves a username into `Blocked` hands a [`BreachEvent`] to the
//! [`AlertPublisher`]; later failures never publish again for the same lockout.
//!
//! Store failures fail closed: the attempt is refused as if the username were
//! blocked, and no alert is raised.
//!
//! # Example
//!
//! ```rust,ignore
//! let guard = ThrottleGuard::new(store, verifier, alerts, ThrottleConfig::default());
//!
//! match guard.attempt(&Credential::new("alice", secret)).await? {
//!     AuthOutcome::Authenticated(principal) => issue_token(&principal),
//!     AuthOutcome::Rejected(reason) => refuse(reason),
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    AttemptRecord, AttemptStore, AuthOutcome, Credential, CredentialVerifier, Error,
    PasswordHashMatcher, RejectReason, SecretMatcher, ThrottleConfig, UserDirectory,
    validation::validate_username,
};
use bastion_alert::{AlertPublisher, BreachEvent};

/// Throttle state of a single username.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    Clear,
    Accumulating(u32),
    Blocked { remaining_cooldown: Duration },
}

impl ThrottleState {
    pub fn is_blocked(&self) -> bool {
        matches!(self, ThrottleState::Blocked { .. })
    }
}

/// Verifies credentials while counting failures and blocking repeat offenders.
///
/// # Thread Safety
///
/// The guard is shared across request tasks behind an `Arc`. Per-username
/// consistency comes from [`AttemptStore::increment`] returning the
/// post-increment count atomically: exactly one caller observes the count
/// equal to the threshold, and only that caller publishes the breach alert.
///
/// The store's own TTL must not be shorter than
/// [`ThrottleConfig::effective_record_ttl`], or a lockout could be forgotten
/// before it ends.
pub struct ThrottleGuard<S, D, M = PasswordHashMatcher>
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    store: Arc<S>,
    verifier: CredentialVerifier<D, M>,
    alerts: Arc<AlertPublisher>,
    config: ThrottleConfig,
}

impl<S, D, M> ThrottleGuard<S, D, M>
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    pub fn new(
        store: Arc<S>,
        verifier: CredentialVerifier<D, M>,
        alerts: Arc<AlertPublisher>,
        config: ThrottleConfig,
    ) -> Self {
        Self {
            store,
            verifier,
            alerts,
            config,
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn verifier(&self) -> &CredentialVerifier<D, M> {
        &self.verifier
    }

    pub fn alerts(&self) -> &Arc<AlertPublisher> {
        &self.alerts
    }

    /// Run one login attempt through the throttle.
    ///
    /// The returned outcome is never `Rejected(UnknownUser)`: unknown users are
    /// reported as `InvalidCredentials` so callers cannot enumerate accounts.
    ///
    /// # Errors
    ///
    /// Only a failing user directory produces `Err`. Attempt store failures
    /// are absorbed and reported as `TooManyAttempts`.
    pub async fn attempt(&self, credential: &Credential<'_>) -> Result<AuthOutcome, Error> {
        let username = credential.username;

        if !self.config.enabled {
            let outcome = self.verifier.verify(credential).await?;
            return Ok(collapse_unknown_user(outcome));
        }

        // Cannot match a stored principal, and must not create a record.
        if let Err(e) = validate_username(username) {
            tracing::debug!(error = %e, "Rejecting login with malformed username");
            return Ok(AuthOutcome::Rejected(RejectReason::InvalidCredentials));
        }

        let record = match self.store.get(username).await {
            Ok(record) => record,
            Err(e) => return Ok(self.fail_closed(username, &e)),
        };

        match (self.state_for(record.as_ref(), Utc::now()), record) {
            (ThrottleState::Blocked { remaining_cooldown }, _) => {
                tracing::debug!(
                    username = %username,
                    remaining_secs = remaining_cooldown.num_seconds(),
                    "Login refused, username is blocked"
                );
                return Ok(AuthOutcome::too_many_attempts(remaining_cooldown));
            }
            (ThrottleState::Clear, Some(expired)) => {
                // Only reset the record that was read; a concurrent request may
                // already have reset it and counted a new failure.
                match self.store.clear_if_unchanged(&expired).await {
                    Ok(true) => {
                        tracing::info!(username = %username, "Lockout period elapsed, resetting attempts");
                    }
                    Ok(false) => {}
                    Err(e) => return Ok(self.fail_closed(username, &e)),
                }
            }
            _ => {}
        }

        match self.verifier.verify(credential).await? {
            AuthOutcome::Authenticated(principal) => {
                if let Err(e) = self.store.clear(username).await {
                    return Ok(self.fail_closed(username, &e));
                }
                tracing::debug!(username = %username, "Login succeeded");
                Ok(AuthOutcome::Authenticated(principal))
            }
            AuthOutcome::Rejected(reason) => {
                if reason == RejectReason::UnknownUser {
                    tracing::debug!(username = %username, "Counting failed login for unknown user");
                }
                let count = match self.store.increment(username).await {
                    Ok(count) => count,
                    Err(e) => return Ok(self.fail_closed(username, &e)),
                };
                Ok(self.after_failure(username, count))
            }
        }
    }

    /// Map a post-increment failure count to an outcome, publishing the breach
    /// alert on the exact crossing.
    fn after_failure(&self, username: &str, count: u32) -> AuthOutcome {
        let threshold = self.config.threshold();

        if count < threshold {
            tracing::debug!(username = %username, attempts = count, "Login failed");
            return AuthOutcome::Rejected(RejectReason::InvalidCredentials);
        }

        if count == threshold {
            tracing::warn!(
                username = %username,
                attempts = count,
                "Username reached maximum login attempts, blocking"
            );
            self.alerts.publish(BreachEvent::new(username, count));
        } else {
            // Raced past a concurrent crossing; that request owns the alert.
            tracing::debug!(username = %username, attempts = count, "Login failed while blocked");
        }

        AuthOutcome::too_many_attempts(self.config.lockout_period)
    }

    fn fail_closed(&self, username: &str, error: &Error) -> AuthOutcome {
        tracing::error!(
            username = %username,
            error = %error,
            "Attempt store unavailable, refusing login"
        );
        AuthOutcome::too_many_attempts(self.config.lockout_period)
    }

    fn state_for(&self, record: Option<&AttemptRecord>, now: DateTime<Utc>) -> ThrottleState {
        let Some(record) = record else {
            return ThrottleState::Clear;
        };

        if record.failure_count < self.config.threshold() {
            return ThrottleState::Accumulating(record.failure_count);
        }

        let remaining_cooldown = record.last_updated + self.config.lockout_period - now;
        if remaining_cooldown > Duration::zero() {
            ThrottleState::Blocked { remaining_cooldown }
        } else {
            ThrottleState::Clear
        }
    }

    /// Current throttle state of a username. Read-only.
    pub async fn lockout_status(&self, username: &str) -> Result<ThrottleState, Error> {
        if !self.config.enabled {
            return Ok(ThrottleState::Clear);
        }

        let record = self.store.get(username).await?;
        Ok(self.state_for(record.as_ref(), Utc::now()))
    }

    /// Clear a username's failures regardless of state.
    ///
    /// # Returns
    ///
    /// `true` if the username was blocked.
    pub async fn unlock(&self, username: &str) -> Result<bool, Error> {
        let was_blocked = self.lockout_status(username).await?.is_blocked();
        self.store.clear(username).await?;

        if was_blocked {
            tracing::info!(username = %username, "Username unlocked");
        }
        Ok(was_blocked)
    }

    /// Start the background task that evicts idle attempt records.
    ///
    /// Runs every `sweep_interval` until `shutdown` changes.
    pub fn start_sweeper(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let ttl = self.config.effective_record_ttl();
        let sweep_interval = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(sweep_interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let before = Utc::now() - ttl;
                        match store.sweep_expired(before).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count = count, "Swept expired login attempt records");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to sweep login attempt records");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login attempt sweeper");
                        break;
                    }
                }
            }
        })
    }
}

fn collapse_unknown_user(outcome: AuthOutcome) -> AuthOutcome {
    match outcome {
        AuthOutcome::Rejected(RejectReason::UnknownUser) => {
            AuthOutcome::Rejected(RejectReason::InvalidCredentials)
        }
        other => other,
    }
}
