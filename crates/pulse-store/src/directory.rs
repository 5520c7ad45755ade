//! Known-user directory.

use async_trait::async_trait;
use std::collections::HashMap;

use pulse_core::error::StoreResult;
use pulse_core::{UserId, UserIdentity};

/// The population `All` and `Roles` audiences resolve against,
/// including users who are currently offline. Role lookups come from
/// here; a user the directory does not know cannot match a role-scoped
/// audience.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn known_users(&self) -> StoreResult<Vec<UserIdentity>>;

    async fn identity(&self, user: &UserId) -> StoreResult<Option<UserIdentity>>;
}

/// Directory backed by a static roster (typically the server config).
pub struct StaticDirectory {
    users: HashMap<UserId, UserIdentity>,
}

impl StaticDirectory {
    pub fn new(roster: impl IntoIterator<Item = UserIdentity>) -> Self {
        Self {
            users: roster
                .into_iter()
                .map(|identity| (identity.id.clone(), identity))
                .collect(),
        }
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn known_users(&self) -> StoreResult<Vec<UserIdentity>> {
        Ok(self.users.values().cloned().collect())
    }

    async fn identity(&self, user: &UserId) -> StoreResult<Option<UserIdentity>> {
        Ok(self.users.get(user).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_directory_lookup() {
        let directory = StaticDirectory::new([
            UserIdentity::new("alice", "admin"),
            UserIdentity::new("bob", "student"),
        ]);

        assert_eq!(directory.known_users().await.unwrap().len(), 2);
        let alice = directory
            .identity(&UserId::new("alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.role.as_str(), "admin");
        assert!(directory
            .identity(&UserId::new("ghost"))
            .await
            .unwrap()
            .is_none());
    }
}
