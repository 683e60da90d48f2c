//! Service layer for the login pipeline
//!
//! [`CredentialVerifier`] answers "does this secret match this user" and
//! nothing else. [`ThrottleGuard`] wraps it with attempt counting, lockout and
//! breach alerting.

pub mod throttle;
pub mod verifier;

pub use throttle::{ThrottleGuard, ThrottleState};
pub use verifier::CredentialVerifier;
