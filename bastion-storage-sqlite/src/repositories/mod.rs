//! Repository implementations for SQLite storage

pub mod attempt;
pub mod user;

pub use attempt::SqliteAttemptStore;
pub use user::SqliteUserDirectory;
