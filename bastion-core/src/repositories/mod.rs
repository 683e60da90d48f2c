//! Repository traits for data access layer
//!
//! These are the seams between the login pipeline and its storage. Services
//! depend only on these traits; backends live in [`crate::storage`] and the
//! `bastion-storage-sqlite` crate.

pub mod attempt;
pub mod user;

pub use attempt::AttemptStore;
pub use user::UserDirectory;
