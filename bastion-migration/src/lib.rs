//! Schema migration traits shared by bastion's SQL storage backends.
//!
//! A backend defines its schema as a list of [`Migration`]s and a
//! [`MigrationManager`] that records which versions have been applied.

use async_trait::async_trait;
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

/// Name of the table that tracks applied migrations.
pub const MIGRATION_TABLE: &str = "_bastion_migrations";

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    /// Execute the migration
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Rollback the migration
    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Unique version number for ordering migrations
    fn version(&self) -> i64;

    /// Human readable name of the migration
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix timestamp in seconds
    pub applied_at: i64,
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        MIGRATION_TABLE
    }

    /// Initialize migration tracking table
    async fn initialize(&self) -> Result<()>;

    /// Apply pending migrations in order. Each runs in its own transaction.
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Roll back applied migrations, newest first.
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Get list of applied migrations
    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    /// Check if specific migration was applied
    async fn is_applied(&self, version: i64) -> Result<bool>;
}

/// Check that versions are strictly increasing, so `up` applies them in order
/// and no two migrations share a version.
pub fn check_versions<DB: Database>(migrations: &[Box<dyn Migration<DB>>]) -> Result<()> {
    for pair in migrations.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.version() <= prev.version() {
            return Err(MigrationError::Migration(format!(
                "Migration {} (version {}) must come after {} (version {})",
                next.name(),
                next.version(),
                prev.name(),
                prev.version()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Any;

    struct Noop(i64, &'static str);

    #[async_trait]
    impl Migration<Any> for Noop {
        async fn up<'a>(&'a self, _conn: &'a mut <Any as Database>::Connection) -> Result<()> {
            Ok(())
        }

        async fn down<'a>(&'a self, _conn: &'a mut <Any as Database>::Connection) -> Result<()> {
            Ok(())
        }

        fn version(&self) -> i64 {
            self.0
        }

        fn name(&self) -> &str {
            self.1
        }
    }

    #[test]
    fn test_check_versions_accepts_increasing() {
        let migrations: Vec<Box<dyn Migration<Any>>> =
            vec![Box::new(Noop(1, "first")), Box::new(Noop(2, "second"))];
        assert!(check_versions(&migrations).is_ok());

        let empty: Vec<Box<dyn Migration<Any>>> = vec![];
        assert!(check_versions(&empty).is_ok());
    }

    #[test]
    fn test_check_versions_rejects_duplicates_and_disorder() {
        let duplicate: Vec<Box<dyn Migration<Any>>> =
            vec![Box::new(Noop(1, "first")), Box::new(Noop(1, "again"))];
        let err = check_versions(&duplicate).unwrap_err();
        assert!(err.to_string().contains("again"));

        let disordered: Vec<Box<dyn Migration<Any>>> =
            vec![Box::new(Noop(2, "second")), Box::new(Noop(1, "first"))];
        assert!(check_versions(&disordered).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = MigrationError::Migration("boom".to_string());
        assert_eq!(err.to_string(), "Migration failed: boom");
    }
}
