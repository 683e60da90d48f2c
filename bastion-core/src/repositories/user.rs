use async_trait::async_trait;

use crate::{Error, StoredUser};

/// Read access to the accounts that may log in.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Look up a user by exact, case-sensitive username.
    ///
    /// `Ok(None)` means the user does not exist. `Err` means the lookup itself
    /// failed and says nothing about the credential.
    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, Error>;
}
