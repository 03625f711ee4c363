//! Account persistence.

use crate::error::StoreError;
use crate::model::{EncryptedSecret, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octolink_core::{SecretId, UserId};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Storage for users and their sealed secrets.
///
/// Each user owns at most one secret. Deleting a user deletes its secret.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new user. Fails with [`StoreError::Duplicate`] if the ID is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Lists every user.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Looks up a user by ID.
    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError>;

    /// Writes the patchable fields and `last_updated_at` of an existing user.
    ///
    /// The GitHub link (`github_token_id`, `github_user_name`) is left as
    /// stored; only [`link_secret`](Self::link_secret) changes it. Fails with
    /// [`StoreError::UserNotFound`] if absent.
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    /// Points the user at `secret_id` and records the GitHub login, touching
    /// no other field. Fails with [`StoreError::UserNotFound`] if absent.
    async fn link_secret(
        &self,
        user_id: &UserId,
        secret_id: SecretId,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Deletes a user and its secret. Returns whether a user was deleted.
    async fn delete_user(&self, user_id: &UserId) -> Result<bool, StoreError>;

    /// Looks up the secret owned by `owner_id`.
    async fn find_secret_by_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Option<EncryptedSecret>, StoreError>;

    /// Inserts the owner's secret, or replaces `value` and `iv` of the one
    /// already stored. Returns the stored record, whose ID is the existing one
    /// on replacement.
    async fn upsert_secret(&self, secret: &EncryptedSecret) -> Result<EncryptedSecret, StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    secrets: BTreeMap<UserId, EncryptedSecret>,
}

/// In-process [`AccountStore`].
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    tables: RwLock<Tables>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.user_id) {
            return Err(StoreError::Duplicate {
                user_id: user.user_id.clone(),
            });
        }
        tables.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user.user_id) {
            Some(stored) => {
                stored.email.clone_from(&user.email);
                stored.is_email_verified = user.is_email_verified;
                stored.is_active = user.is_active;
                stored.is_premium = user.is_premium;
                stored.last_updated_at = user.last_updated_at;
                Ok(())
            }
            None => Err(StoreError::UserNotFound {
                user_id: user.user_id.clone(),
            }),
        }
    }

    async fn link_secret(
        &self,
        user_id: &UserId,
        secret_id: SecretId,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UserNotFound {
                user_id: user_id.clone(),
            })?;
        stored.github_token_id = Some(secret_id);
        stored.github_user_name = Some(username.to_string());
        stored.last_updated_at = at;
        Ok(())
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        tables.secrets.remove(user_id);
        Ok(tables.users.remove(user_id).is_some())
    }

    async fn find_secret_by_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Option<EncryptedSecret>, StoreError> {
        Ok(self.tables.read().await.secrets.get(owner_id).cloned())
    }

    async fn upsert_secret(&self, secret: &EncryptedSecret) -> Result<EncryptedSecret, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&secret.owner_id) {
            return Err(StoreError::UserNotFound {
                user_id: secret.owner_id.clone(),
            });
        }

        let stored = tables
            .secrets
            .entry(secret.owner_id.clone())
            .and_modify(|existing| {
                existing.value.clone_from(&secret.value);
                existing.iv.clone_from(&secret.iv);
            })
            .or_insert_with(|| secret.clone());
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewUser;

    fn user(raw: &str) -> User {
        User::from_new(
            NewUser {
                user_id: UserId::new(raw).expect("valid id"),
                email: None,
                is_email_verified: None,
                is_active: None,
                is_premium: None,
            },
            Utc::now(),
        )
    }

    fn secret(owner: &User, value: &[u8]) -> EncryptedSecret {
        EncryptedSecret {
            id: SecretId::new(),
            value: value.to_vec(),
            iv: vec![7; 16],
            owner_id: owner.user_id.clone(),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryAccountStore::new();
        let u1 = user("u1");
        store.insert_user(&u1).await.expect("first insert");

        let err = store.insert_user(&u1).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Duplicate {
                user_id: u1.user_id.clone()
            }
        );
    }

    #[tokio::test]
    async fn update_of_missing_user_fails() {
        let store = MemoryAccountStore::new();
        assert!(matches!(
            store.update_user(&user("ghost")).await,
            Err(StoreError::UserNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_leaves_github_link_alone() {
        let store = MemoryAccountStore::new();
        let u1 = user("u1");
        store.insert_user(&u1).await.expect("insert");

        let secret_id = SecretId::new();
        store
            .link_secret(&u1.user_id, secret_id, "octocat", Utc::now())
            .await
            .expect("link");

        // A snapshot taken before linking still says "not linked".
        let mut stale = u1.clone();
        stale.is_premium = true;
        store.update_user(&stale).await.expect("update");

        let stored = store
            .find_user(&u1.user_id)
            .await
            .expect("lookup")
            .expect("present");
        assert!(stored.is_premium);
        assert_eq!(stored.github_token_id, Some(secret_id));
        assert_eq!(stored.github_user_name.as_deref(), Some("octocat"));
    }

    #[tokio::test]
    async fn link_of_missing_user_fails() {
        let store = MemoryAccountStore::new();
        let ghost = user("ghost");
        assert!(matches!(
            store
                .link_secret(&ghost.user_id, SecretId::new(), "octocat", Utc::now())
                .await,
            Err(StoreError::UserNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn upsert_keeps_id_and_replaces_material() {
        let store = MemoryAccountStore::new();
        let u1 = user("u1");
        store.insert_user(&u1).await.expect("insert");

        let first = store.upsert_secret(&secret(&u1, b"one")).await.expect("insert");
        let second = store.upsert_secret(&secret(&u1, b"two")).await.expect("replace");

        assert_eq!(first.id, second.id);
        assert_eq!(second.value, b"two".to_vec());
        let found = store
            .find_secret_by_owner(&u1.user_id)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(found.value, b"two".to_vec());
    }

    #[tokio::test]
    async fn secret_requires_existing_owner() {
        let store = MemoryAccountStore::new();
        let ghost = user("ghost");
        assert!(store.upsert_secret(&secret(&ghost, b"x")).await.is_err());
    }

    #[tokio::test]
    async fn deleting_user_cascades_to_secret() {
        let store = MemoryAccountStore::new();
        let u1 = user("u1");
        store.insert_user(&u1).await.expect("insert");
        store.upsert_secret(&secret(&u1, b"x")).await.expect("secret");

        assert!(store.delete_user(&u1.user_id).await.expect("delete"));
        assert!(!store.delete_user(&u1.user_id).await.expect("delete again"));
        assert_eq!(
            store.find_secret_by_owner(&u1.user_id).await.expect("lookup"),
            None
        );
    }
}
