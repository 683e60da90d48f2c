//! Secret hashing and comparison.
//!
//! Stored secrets are argon2 PHC strings produced by [`hash_secret`]. Comparison
//! of anything secret-derived must not exit early on the first differing byte;
//! [`constant_time_compare`] uses the `subtle` crate for that.

use std::sync::LazyLock;

use subtle::ConstantTimeEq;

/// A valid hash that no submitted secret is expected to match.
///
/// Checked in place of a stored hash when the username is unknown, so a miss
/// costs the same hashing work as a wrong secret.
pub static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_secret("bastion-unknown-user-placeholder"));

/// Checks a submitted secret against a stored hash.
pub trait SecretMatcher: Send + Sync + 'static {
    fn matches(&self, secret: &str, stored_hash: &str) -> bool;
}

/// Verifies argon2 (and other PHC-format) hashes with `password-auth`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHashMatcher;

impl SecretMatcher for PasswordHashMatcher {
    fn matches(&self, secret: &str, stored_hash: &str) -> bool {
        password_auth::verify_password(secret, stored_hash).is_ok()
    }
}

/// Hash a secret for storage using argon2 with a random salt.
pub fn hash_secret(secret: &str) -> String {
    password_auth::generate_hash(secret)
}

/// Perform constant-time comparison of two byte slices.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
