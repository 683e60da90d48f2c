//! SQLite implementation of the user directory.

use async_trait::async_trait;
use sqlx::SqlitePool;
use bastion_core::{
    Error, Principal, StoredUser, UserDirectory,
    error::{StorageError, ValidationError},
};

/// Users table lookups. Usernames compare with SQLite's default `BINARY`
/// collation, so lookups are case-sensitive.
pub struct SqliteUserDirectory {
    pool: SqlitePool,
}

impl SqliteUserDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// `StorageError::Constraint` if the username is taken, and
    /// `ValidationError::InvalidField` if a role contains a comma.
    pub async fn create_user(&self, principal: &Principal, secret_hash: &str) -> Result<(), Error> {
        if let Some(role) = principal.roles().iter().find(|r| r.contains(',')) {
            return Err(ValidationError::InvalidField(format!("Role may not contain ',': {role}")).into());
        }
        let roles = principal
            .roles()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");

        sqlx::query("INSERT INTO users (username, secret_hash, roles) VALUES (?, ?, ?)")
            .bind(principal.username())
            .bind(secret_hash)
            .bind(roles)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StorageError::Constraint(format!(
                        "User {} already exists",
                        principal.username()
                    ))
                }
                e => {
                    tracing::error!(error = %e, "Failed to create user");
                    StorageError::Database("Failed to create user".to_string())
                }
            })?;

        Ok(())
    }

    /// Delete a user. Returns whether a row was removed.
    pub async fn delete_user(&self, username: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete user");
                StorageError::Database("Failed to delete user".to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteUser {
    username: String,
    secret_hash: String,
    roles: String,
}

impl From<SqliteUser> for StoredUser {
    fn from(row: SqliteUser) -> Self {
        let roles = row.roles.split(',').filter(|r| !r.is_empty());
        StoredUser::new(Principal::new(row.username, roles), row.secret_hash)
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, Error> {
        let row = sqlx::query_as::<_, SqliteUser>(
            "SELECT username, secret_hash, roles FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to find user");
            StorageError::Database("Failed to find user".to_string())
        })?;

        Ok(row.map(StoredUser::from))
    }
}
