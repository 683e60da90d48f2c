//! SQLite storage backend for bastion.
//!
//! Provides [`SqliteAttemptStore`] and [`SqliteUserDirectory`] over a shared
//! connection pool, and the migrations that create their tables.
//!
//! ```rust,ignore
//! let storage = SqliteStorage::connect("sqlite://bastion.db?mode=rwc").await?;
//! storage.migrate().await?;
//!
//! let attempts = Arc::new(storage.attempt_store(config.effective_record_ttl()));
//! let users = Arc::new(storage.user_directory());
//! ```

pub mod migrations;
pub mod repositories;

use bastion_core::{Error, error::StorageError};
use bastion_migration::MigrationManager;
use chrono::Duration;
use migrations::SqliteMigrationManager;
use sqlx::SqlitePool;

pub use repositories::{SqliteAttemptStore, SqliteUserDirectory};

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for a `sqlite:` URL.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(database_url).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            StorageError::Connection(e.to_string())
        })?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply all pending migrations.
    pub async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager
            .initialize()
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        manager
            .up(&migrations::all())
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        Ok(())
    }

    /// An attempt store whose records expire after `ttl` of inactivity.
    pub fn attempt_store(&self, ttl: Duration) -> SqliteAttemptStore {
        SqliteAttemptStore::new(self.pool.clone(), ttl)
    }

    pub fn user_directory(&self) -> SqliteUserDirectory {
        SqliteUserDirectory::new(self.pool.clone())
    }
}
