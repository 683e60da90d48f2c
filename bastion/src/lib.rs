//! Bastion is a login service that verifies username/secret credentials,
//! blocks a username after repeated consecutive failures, and raises a breach
//! alert the moment a username is blocked.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use bastion::{BastionBuilder, JwtConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bastion = BastionBuilder::new()
//!     .with_sqlite("sqlite://bastion.db?mode=rwc")
//!     .await?
//!     .apply_migrations(true)
//!     .with_jwt_config(JwtConfig::new_hs256(b"change-me".to_vec()))
//!     .build()
//!     .await?;
//!
//! let (principal, token) = bastion.login("alice", "wonderland").await?;
//! println!("{} {}", principal.username(), token.token);
//! # Ok(())
//! # }
//! ```
//!
//! See [`bastion_core`] for the pipeline itself and [`bastion_alert`] for
//! alert delivery.

mod builder;

use std::sync::Arc;

use axum::Router;

pub use bastion_alert::{
    self, AlertConfig, AlertError, AlertPublisher, AlertTransport, BreachEvent, TransportConfig,
};
pub use bastion_axum::{self, SecretEncoding};
pub use bastion_core::{
    self, AttemptStore, AuthOutcome, Credential, Error, IssuedToken, JwtConfig, JwtTokenIssuer,
    PasswordHashMatcher, Principal, RejectReason, SecretMatcher, ThrottleConfig, ThrottleGuard,
    ThrottleState, TokenIssuer, UserDirectory,
    storage::{InMemoryAttemptStore, InMemoryUserDirectory},
};
pub use builder::{BastionBuilder, BastionBuilderError, NoStorage, WithStorage};

#[cfg(feature = "sqlite")]
pub mod sqlite {
    pub use bastion_storage_sqlite::{SqliteAttemptStore, SqliteStorage, SqliteUserDirectory};
}

/// The assembled login service.
pub struct Bastion<S, D, M = PasswordHashMatcher>
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    guard: Arc<ThrottleGuard<S, D, M>>,
    tokens: Arc<dyn TokenIssuer>,
    alerts: Arc<AlertPublisher>,
}

impl<S, D, M> Bastion<S, D, M>
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    pub fn new(
        guard: Arc<ThrottleGuard<S, D, M>>,
        tokens: Arc<dyn TokenIssuer>,
        alerts: Arc<AlertPublisher>,
    ) -> Self {
        Self {
            guard,
            tokens,
            alerts,
        }
    }

    pub fn guard(&self) -> &Arc<ThrottleGuard<S, D, M>> {
        &self.guard
    }

    pub fn tokens(&self) -> &Arc<dyn TokenIssuer> {
        &self.tokens
    }

    pub fn alerts(&self) -> &Arc<AlertPublisher> {
        &self.alerts
    }

    /// Run one attempt and return the raw outcome.
    pub async fn attempt(&self, username: &str, secret: &str) -> Result<AuthOutcome, Error> {
        self.guard.attempt(&Credential::new(username, secret)).await
    }

    /// Log in and issue a bearer token.
    ///
    /// Rejections come back as `Error::Auth`, with unknown users reported as
    /// `InvalidCredentials`.
    pub async fn login(
        &self,
        username: &str,
        secret: &str,
    ) -> Result<(Principal, IssuedToken), Error> {
        let principal = self
            .attempt(username, secret)
            .await?
            .into_result()
            .map_err(Error::Auth)?;
        let token = self.tokens.issue(&principal)?;
        Ok((principal, token))
    }

    pub async fn lockout_status(&self, username: &str) -> Result<ThrottleState, Error> {
        self.guard.lockout_status(username).await
    }

    /// Clear a username's failures. Returns whether it was blocked.
    pub async fn unlock(&self, username: &str) -> Result<bool, Error> {
        self.guard.unlock(username).await
    }

    /// Start the background sweep of idle attempt records.
    pub fn start_sweeper(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        self.guard.start_sweeper(shutdown)
    }

    /// HTTP routes for `/login` and `/health`.
    pub fn router(&self, secret_encoding: SecretEncoding) -> Router {
        bastion_axum::routes(Arc::clone(&self.guard), Arc::clone(&self.tokens))
            .with_secret_encoding(secret_encoding)
            .build()
    }

    /// Stop accepting alerts and wait for queued ones to be delivered.
    pub async fn shutdown(&self) {
        self.alerts.shutdown().await;
    }
}
