//! Principals returned by the user directory.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Prefix applied to each role when it is granted as an authority.
pub const ROLE_PREFIX: &str = "ROLE_";

/// An authenticated identity and the roles it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    username: String,
    roles: BTreeSet<String>,
}

impl Principal {
    pub fn new<I, R>(username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            username: username.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Roles in their granted form, e.g. `ROLE_ADMIN`.
    pub fn granted_authorities(&self) -> Vec<String> {
        self.roles
            .iter()
            .map(|role| {
                if role.starts_with(ROLE_PREFIX) {
                    role.clone()
                } else {
                    format!("{ROLE_PREFIX}{role}")
                }
            })
            .collect()
    }
}

/// What a [`UserDirectory`](crate::UserDirectory) returns for a username: the
/// principal and its stored secret hash.
#[derive(Clone)]
pub struct StoredUser {
    pub principal: Principal,
    pub secret_hash: String,
}

impl StoredUser {
    pub fn new(principal: Principal, secret_hash: impl Into<String>) -> Self {
        Self {
            principal,
            secret_hash: secret_hash.into(),
        }
    }
}

impl std::fmt::Debug for StoredUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredUser")
            .field("principal", &self.principal)
            .field("secret_hash", &"<redacted>")
            .finish()
    }
}
