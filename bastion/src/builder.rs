//! Builder for assembling a [`Bastion`] instance
//!
//! The builder uses the same type-state shape as the storage it wraps: it
//! starts in [`NoStorage`] and can only be built once an attempt store and user
//! directory have been chosen.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bastion::{BastionBuilder, InMemoryUserDirectory, JwtConfig, ThrottleConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bastion = BastionBuilder::new()
//!     .with_memory(Arc::new(InMemoryUserDirectory::new()))
//!     .with_throttle_config(ThrottleConfig::default().with_max_failed_attempts(3))
//!     .with_jwt_config(JwtConfig::new_hs256(b"change-me".to_vec()))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use bastion_alert::{AlertConfig, AlertPublisher, AlertTransport};
use bastion_core::{
    AttemptStore, CredentialVerifier, JwtConfig, JwtTokenIssuer, ThrottleConfig, ThrottleGuard,
    UserDirectory,
    storage::{InMemoryAttemptStore, InMemoryUserDirectory},
};
use chrono::Duration;

use crate::Bastion;

/// Errors that can occur when building a Bastion instance.
#[derive(Debug, thiserror::Error)]
pub enum BastionBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Failed to set up alert delivery
    #[error("Alert configuration failed: {0}")]
    AlertConfiguration(String),
}

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

type StoreFactory<S> = Box<dyn FnOnce(Duration) -> S + Send>;

/// Marker type indicating storage has been configured.
///
/// The attempt store is created at build time, once the record TTL is known.
pub struct WithStorage<S: AttemptStore, D: UserDirectory> {
    make_store: StoreFactory<S>,
    directory: Arc<D>,
    #[cfg(feature = "sqlite")]
    sqlite: Option<bastion_storage_sqlite::SqliteStorage>,
}

/// A type-safe builder for constructing [`Bastion`] instances.
pub struct BastionBuilder<Storage> {
    storage: Storage,
    throttle_config: ThrottleConfig,
    alert_config: AlertConfig,
    alert_transport: Option<Arc<dyn AlertTransport>>,
    jwt_config: Option<JwtConfig>,
    apply_migrations: bool,
}

impl Default for BastionBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl BastionBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Throttling: enabled (5 attempts, 15 min lockout)
    /// - Alerts: logged, topic `login-attempts`
    /// - JWT: none, must be set before building
    /// - Apply migrations: false
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            throttle_config: ThrottleConfig::default(),
            alert_config: AlertConfig::default(),
            alert_transport: None,
            jwt_config: None,
            apply_migrations: false,
        }
    }

    fn with_storage_state<S, D>(self, storage: WithStorage<S, D>) -> BastionBuilder<WithStorage<S, D>>
    where
        S: AttemptStore,
        D: UserDirectory,
    {
        BastionBuilder {
            storage,
            throttle_config: self.throttle_config,
            alert_config: self.alert_config,
            alert_transport: self.alert_transport,
            jwt_config: self.jwt_config,
            apply_migrations: self.apply_migrations,
        }
    }

    /// Keep attempt counts in process memory and read users from `directory`.
    pub fn with_memory(
        self,
        directory: Arc<InMemoryUserDirectory>,
    ) -> BastionBuilder<WithStorage<InMemoryAttemptStore, InMemoryUserDirectory>> {
        self.with_storage(InMemoryAttemptStore::new, directory)
    }

    /// Use a custom attempt store and user directory.
    ///
    /// `make_store` receives the record TTL the throttle requires.
    pub fn with_storage<S, D, F>(
        self,
        make_store: F,
        directory: Arc<D>,
    ) -> BastionBuilder<WithStorage<S, D>>
    where
        S: AttemptStore,
        D: UserDirectory,
        F: FnOnce(Duration) -> S + Send + 'static,
    {
        self.with_storage_state(WithStorage {
            make_store: Box::new(make_store),
            directory,
            #[cfg(feature = "sqlite")]
            sqlite: None,
        })
    }
}

#[cfg(feature = "sqlite")]
impl BastionBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// Both attempt counts and users live in the database.
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<
        BastionBuilder<
            WithStorage<
                bastion_storage_sqlite::SqliteAttemptStore,
                bastion_storage_sqlite::SqliteUserDirectory,
            >,
        >,
        BastionBuilderError,
    > {
        let storage = bastion_storage_sqlite::SqliteStorage::connect(url)
            .await
            .map_err(|e| BastionBuilderError::StorageConnection(e.to_string()))?;

        let directory = Arc::new(storage.user_directory());
        let pool = storage.pool().clone();

        Ok(self.with_storage_state(WithStorage {
            make_store: Box::new(move |ttl| {
                bastion_storage_sqlite::SqliteAttemptStore::new(pool, ttl)
            }),
            directory,
            sqlite: Some(storage),
        }))
    }
}

impl<Storage> BastionBuilder<Storage> {
    pub fn with_throttle_config(mut self, config: ThrottleConfig) -> Self {
        self.throttle_config = config;
        self
    }

    pub fn with_alert_config(mut self, config: AlertConfig) -> Self {
        self.alert_config = config;
        self
    }

    /// Deliver alerts through this transport instead of the one described by
    /// the alert config.
    pub fn with_alert_transport(mut self, transport: Arc<dyn AlertTransport>) -> Self {
        self.alert_transport = Some(transport);
        self
    }

    pub fn with_jwt_config(mut self, config: JwtConfig) -> Self {
        self.jwt_config = Some(config);
        self
    }

    /// Run pending migrations during [`build`](BastionBuilder::build). Has no
    /// effect for in-memory storage.
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }
}

impl<S: AttemptStore, D: UserDirectory> BastionBuilder<WithStorage<S, D>> {
    /// Build the service. Must be called inside a tokio runtime; the alert
    /// worker is spawned here.
    pub async fn build(self) -> Result<Bastion<S, D>, BastionBuilderError> {
        let jwt_config = self.jwt_config.ok_or_else(|| {
            BastionBuilderError::InvalidConfiguration("JWT signing key is not configured".to_string())
        })?;

        #[cfg(feature = "sqlite")]
        if self.apply_migrations {
            if let Some(sqlite) = &self.storage.sqlite {
                sqlite
                    .migrate()
                    .await
                    .map_err(|e| BastionBuilderError::Migration(e.to_string()))?;
            }
        }

        let transport = match self.alert_transport {
            Some(transport) => transport,
            None => self
                .alert_config
                .build_transport()
                .map_err(|e| BastionBuilderError::AlertConfiguration(e.to_string()))?,
        };
        let alerts = Arc::new(AlertPublisher::spawn(transport, &self.alert_config));

        let store = Arc::new((self.storage.make_store)(
            self.throttle_config.effective_record_ttl(),
        ));
        let verifier = CredentialVerifier::new(self.storage.directory);
        let guard = Arc::new(ThrottleGuard::new(
            store,
            verifier,
            Arc::clone(&alerts),
            self.throttle_config,
        ));

        tracing::info!(
            enabled = guard.is_enabled(),
            threshold = guard.config().threshold(),
            lockout_secs = guard.config().lockout_period.num_seconds(),
            topic = %self.alert_config.topic,
            "Bastion initialized"
        );

        Ok(Bastion::new(
            guard,
            Arc::new(JwtTokenIssuer::new(jwt_config)),
            alerts,
        ))
    }
}
