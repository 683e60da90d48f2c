//! In-process storage backends.
//!
//! These keep state in memory for the lifetime of the process. They are the
//! default for a single-instance deployment and for tests; persistent
//! backends live in their own crates.

mod memory;

pub use memory::{InMemoryAttemptStore, InMemoryUserDirectory};
