//! Account operations and the GitHub token lifecycle.

use crate::error::AccountError;
use crate::model::{EncryptedSecret, NewUser, User, UserUpdate};
use crate::store::AccountStore;
use chrono::Utc;
use octolink_core::{SecretId, UserId};
use octolink_github::{CodeExchanger, TokenProvider};
use octolink_vault::TokenVault;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const MISSING_USERNAME: &str = "Could not get GitHub username from token";

/// Manages users and the GitHub tokens linked to them.
///
/// Tokens are sealed with the [`TokenVault`] before they reach the store and
/// re-validated against GitHub whenever they are read back.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    vault: Arc<TokenVault>,
    tokens: Arc<dyn TokenProvider>,
    oauth: Option<Arc<dyn CodeExchanger>>,
}

impl AccountService {
    /// Creates a service without an OAuth app; code linking is unavailable.
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        vault: Arc<TokenVault>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            store,
            vault,
            tokens,
            oauth: None,
        }
    }

    /// Enables linking accounts from OAuth authorization codes.
    #[must_use]
    pub fn with_code_exchanger(mut self, oauth: Arc<dyn CodeExchanger>) -> Self {
        self.oauth = Some(oauth);
        self
    }

    #[instrument(skip(self, new), fields(user_id = %new.user_id))]
    pub async fn create(&self, new: NewUser) -> Result<User, AccountError> {
        let user = User::from_new(new, Utc::now());
        self.store.insert_user(&user).await?;
        info!("created user");
        Ok(user)
    }

    pub async fn find_all(&self) -> Result<Vec<User>, AccountError> {
        Ok(self.store.list_users().await?)
    }

    /// Looks up a user. An unknown ID is `Ok(None)`, not an error.
    pub async fn find_one(&self, user_id: &UserId) -> Result<Option<User>, AccountError> {
        Ok(self.store.find_user(user_id).await?)
    }

    /// Patches a user.
    ///
    /// If the patch carries a GitHub token it is linked first, and nothing
    /// else is applied when linking fails.
    #[instrument(skip(self, update), fields(user_id = %user_id))]
    pub async fn update(&self, user_id: &UserId, update: UserUpdate) -> Result<User, AccountError> {
        if let Some(token) = update.github_token.as_deref().filter(|t| !t.is_empty()) {
            self.save_token(user_id, token).await?;
        }

        let mut user = self.require_user(user_id).await?;
        user.apply(&update, Utc::now());
        self.store.update_user(&user).await?;
        debug!("updated user");
        self.require_user(user_id).await
    }

    /// Deletes a user along with its stored token.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn remove(&self, user_id: &UserId) -> Result<bool, AccountError> {
        let removed = self.store.delete_user(user_id).await?;
        if removed {
            info!("removed user");
        }
        Ok(removed)
    }

    /// Validates a GitHub token, seals it, and links it to the user.
    ///
    /// Validation happens before anything is written, so a rejected token
    /// leaves the user and any previously linked token untouched.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn save_token(&self, user_id: &UserId, token: &str) -> Result<(), AccountError> {
        self.require_user(user_id).await?;

        if !self.validate(token).await? {
            return Err(AccountError::InvalidToken);
        }
        let username = self
            .tokens
            .resolve_username(token)
            .await
            .map_err(|report| {
                warn!(error = %report, "failed to resolve github username");
                AccountError::Upstream {
                    details: MISSING_USERNAME.to_string(),
                }
            })?
            .ok_or_else(|| AccountError::Upstream {
                details: MISSING_USERNAME.to_string(),
            })?;

        let sealed = self.vault.encrypt(token);
        let stored = self
            .store
            .upsert_secret(&EncryptedSecret {
                id: SecretId::new(),
                value: sealed.value,
                iv: sealed.iv.to_vec(),
                owner_id: user_id.clone(),
            })
            .await?;

        self.store
            .link_secret(user_id, stored.id, &username, Utc::now())
            .await?;

        info!(secret_id = %stored.id, "linked github token");
        Ok(())
    }

    /// Returns the user's GitHub token in plaintext, if it is still valid.
    ///
    /// A missing token and one GitHub no longer accepts both yield
    /// [`AccountError::TokenNotFound`].
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn token_for_user(&self, user_id: &UserId) -> Result<String, AccountError> {
        let secret = self
            .store
            .find_secret_by_owner(user_id)
            .await?
            .ok_or(AccountError::TokenNotFound)?;

        let token = self
            .vault
            .decrypt(&secret.value, &secret.iv)
            .map_err(|report| AccountError::Vault {
                details: report.to_string(),
            })?;

        if self.validate(&token).await? {
            Ok(token)
        } else {
            debug!("stored token is no longer valid");
            Err(AccountError::TokenNotFound)
        }
    }

    pub async fn has_valid_token(&self, user_id: &UserId) -> Result<bool, AccountError> {
        let token = self.token_for_user(user_id).await?;
        self.validate(&token).await
    }

    pub async fn github_username(&self, user_id: &UserId) -> Result<Option<String>, AccountError> {
        let token = self.token_for_user(user_id).await?;
        self.tokens
            .resolve_username(&token)
            .await
            .map_err(|report| AccountError::Upstream {
                details: report.to_string(),
            })
    }

    /// Exchanges an OAuth authorization code for a token and links it.
    #[instrument(skip(self, code), fields(user_id = %user_id))]
    pub async fn link_with_code(&self, user_id: &UserId, code: &str) -> Result<(), AccountError> {
        let oauth = self.oauth.as_ref().ok_or(AccountError::OAuthUnavailable)?;
        let token = oauth
            .exchange_code(code)
            .await
            .map_err(|report| AccountError::Upstream {
                details: report.to_string(),
            })?;
        self.save_token(user_id, &token).await
    }

    async fn require_user(&self, user_id: &UserId) -> Result<User, AccountError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AccountError::UserNotFound {
                user_id: user_id.clone(),
            })
    }

    async fn validate(&self, token: &str) -> Result<bool, AccountError> {
        self.tokens
            .validate(token)
            .await
            .map_err(|report| AccountError::Upstream {
                details: report.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryAccountStore;
    use async_trait::async_trait;
    use octolink_github::GithubError;
    use rootcause::prelude::Report;
    use std::collections::HashMap;
    use std::sync::{LazyLock, Mutex};

    static VAULT: LazyLock<Arc<TokenVault>> =
        LazyLock::new(|| Arc::new(TokenVault::new("password").expect("passphrase is set")));

    /// GitHub stand-in whose set of valid tokens can change mid-test.
    #[derive(Default)]
    struct FakeGithub {
        logins: Mutex<HashMap<String, Option<String>>>,
        down: Mutex<bool>,
    }

    impl FakeGithub {
        fn accept(&self, token: &str, login: Option<&str>) {
            self.logins
                .lock()
                .unwrap()
                .insert(token.to_string(), login.map(str::to_string));
        }

        fn revoke(&self, token: &str) {
            self.logins.lock().unwrap().remove(token);
        }

        fn go_down(&self) {
            *self.down.lock().unwrap() = true;
        }

        fn check_up(&self) -> Result<(), Report<GithubError>> {
            if *self.down.lock().unwrap() {
                return Err(GithubError::UnexpectedStatus {
                    endpoint: "/",
                    status: 503,
                }
                .into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TokenProvider for FakeGithub {
        async fn validate(&self, token: &str) -> Result<bool, Report<GithubError>> {
            self.check_up()?;
            Ok(self.logins.lock().unwrap().contains_key(token))
        }

        async fn resolve_username(
            &self,
            token: &str,
        ) -> Result<Option<String>, Report<GithubError>> {
            self.check_up()?;
            Ok(self.logins.lock().unwrap().get(token).cloned().flatten())
        }
    }

    struct FakeExchanger;

    #[async_trait]
    impl CodeExchanger for FakeExchanger {
        async fn exchange_code(&self, code: &str) -> Result<String, Report<GithubError>> {
            match code {
                "good-code" => Ok("ghp_from_code".to_string()),
                _ => Err(GithubError::TokenExchange {
                    reason: "bad_verification_code".to_string(),
                }
                .into()),
            }
        }
    }

    struct Harness {
        service: AccountService,
        store: Arc<MemoryAccountStore>,
        github: Arc<FakeGithub>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryAccountStore::new());
            let github = Arc::new(FakeGithub::default());
            let service = AccountService::new(store.clone(), VAULT.clone(), github.clone());
            Self {
                service,
                store,
                github,
            }
        }

        async fn with_user(self, raw: &str) -> Self {
            self.service
                .create(new_user(raw))
                .await
                .expect("user created");
            self
        }
    }

    fn uid(raw: &str) -> UserId {
        UserId::new(raw).expect("valid id")
    }

    fn new_user(raw: &str) -> NewUser {
        NewUser {
            user_id: uid(raw),
            email: None,
            is_email_verified: None,
            is_active: None,
            is_premium: None,
        }
    }

    #[tokio::test]
    async fn saved_token_reads_back_until_revoked() {
        let h = Harness::new().with_user("u1").await;
        h.github.accept("ghp_abc", Some("octocat"));

        h.service
            .save_token(&uid("u1"), "ghp_abc")
            .await
            .expect("token saved");
        assert_eq!(
            h.service.token_for_user(&uid("u1")).await.expect("readable"),
            "ghp_abc"
        );

        let user = h
            .service
            .find_one(&uid("u1"))
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(user.github_user_name.as_deref(), Some("octocat"));
        assert!(user.github_token_id.is_some());

        h.github.revoke("ghp_abc");
        assert_eq!(
            h.service.token_for_user(&uid("u1")).await.unwrap_err(),
            AccountError::TokenNotFound
        );
    }

    #[tokio::test]
    async fn stored_secret_is_ciphertext() {
        let h = Harness::new().with_user("u1").await;
        h.github.accept("ghp_plaintext_value", Some("octocat"));
        h.service
            .save_token(&uid("u1"), "ghp_plaintext_value")
            .await
            .expect("token saved");

        let secret = h
            .store
            .find_secret_by_owner(&uid("u1"))
            .await
            .expect("lookup")
            .expect("present");
        assert_ne!(secret.value, b"ghp_plaintext_value".to_vec());
        assert_eq!(secret.iv.len(), 16);
    }

    #[tokio::test]
    async fn relinking_replaces_material_under_same_id() {
        let h = Harness::new().with_user("u1").await;
        h.github.accept("ghp_one", Some("octocat"));
        h.github.accept("ghp_two", Some("octocat"));

        h.service.save_token(&uid("u1"), "ghp_one").await.expect("first");
        let first = h.store.find_secret_by_owner(&uid("u1")).await.unwrap().unwrap();
        h.service.save_token(&uid("u1"), "ghp_two").await.expect("second");
        let second = h.store.find_secret_by_owner(&uid("u1")).await.unwrap().unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.iv, second.iv);
        assert_eq!(
            h.service.token_for_user(&uid("u1")).await.expect("readable"),
            "ghp_two"
        );
    }

    #[tokio::test]
    async fn invalid_token_writes_nothing() {
        let h = Harness::new().with_user("u1").await;

        let err = h.service.save_token(&uid("u1"), "ghp_nope").await.unwrap_err();
        assert_eq!(err, AccountError::InvalidToken);
        assert_eq!(h.store.find_secret_by_owner(&uid("u1")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn token_without_username_writes_nothing() {
        let h = Harness::new().with_user("u1").await;
        h.github.accept("ghp_anon", None);

        let err = h.service.save_token(&uid("u1"), "ghp_anon").await.unwrap_err();
        assert_eq!(err.to_string(), "Could not get GitHub username from token");
        assert_eq!(h.store.find_secret_by_owner(&uid("u1")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn saving_for_unknown_user_fails_before_github() {
        let h = Harness::new();
        h.github.go_down();
        assert_eq!(
            h.service.save_token(&uid("ghost"), "ghp_abc").await.unwrap_err(),
            AccountError::UserNotFound {
                user_id: uid("ghost")
            }
        );
    }

    #[tokio::test]
    async fn missing_token_is_not_found() {
        let h = Harness::new().with_user("u1").await;
        assert_eq!(
            h.service.token_for_user(&uid("u1")).await.unwrap_err(),
            AccountError::TokenNotFound
        );
        assert_eq!(
            h.service.has_valid_token(&uid("u1")).await.unwrap_err(),
            AccountError::TokenNotFound
        );
    }

    #[tokio::test]
    async fn github_outage_is_upstream_error() {
        let h = Harness::new().with_user("u1").await;
        h.github.accept("ghp_abc", Some("octocat"));
        h.service.save_token(&uid("u1"), "ghp_abc").await.expect("saved");

        h.github.go_down();
        assert!(matches!(
            h.service.token_for_user(&uid("u1")).await,
            Err(AccountError::Upstream { .. })
        ));
    }

    #[tokio::test]
    async fn valid_token_and_username_queries() {
        let h = Harness::new().with_user("u1").await;
        h.github.accept("ghp_abc", Some("octocat"));
        h.service.save_token(&uid("u1"), "ghp_abc").await.expect("saved");

        assert!(h.service.has_valid_token(&uid("u1")).await.expect("checked"));
        assert_eq!(
            h.service.github_username(&uid("u1")).await.expect("resolved"),
            Some("octocat".to_string())
        );
    }

    #[tokio::test]
    async fn duplicate_create_is_reported() {
        let h = Harness::new().with_user("u1").await;
        assert_eq!(
            h.service.create(new_user("u1")).await.unwrap_err(),
            AccountError::Duplicate { user_id: uid("u1") }
        );
    }

    #[tokio::test]
    async fn find_one_of_unknown_user_is_none() {
        let h = Harness::new();
        assert_eq!(h.service.find_one(&uid("nobody")).await.expect("lookup"), None);
        assert!(h.service.find_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn update_links_token_then_applies_fields() {
        let h = Harness::new().with_user("u1").await;
        h.github.accept("ghp_abc", Some("octocat"));

        let user = h
            .service
            .update(
                &uid("u1"),
                UserUpdate {
                    is_premium: Some(true),
                    github_token: Some("ghp_abc".to_string()),
                    ..UserUpdate::default()
                },
            )
            .await
            .expect("updated");

        assert!(user.is_premium);
        assert_eq!(user.github_user_name.as_deref(), Some("octocat"));
        assert!(user.last_updated_at >= user.created_at);
    }

    #[tokio::test]
    async fn update_with_invalid_token_changes_nothing() {
        let h = Harness::new().with_user("u1").await;

        let err = h
            .service
            .update(
                &uid("u1"),
                UserUpdate {
                    is_premium: Some(true),
                    github_token: Some("ghp_bad".to_string()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, AccountError::InvalidToken);

        let user = h.service.find_one(&uid("u1")).await.unwrap().unwrap();
        assert!(!user.is_premium);
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_not_found() {
        let h = Harness::new();
        assert!(matches!(
            h.service.update(&uid("ghost"), UserUpdate::default()).await,
            Err(AccountError::UserNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn remove_cascades_to_token() {
        let h = Harness::new().with_user("u1").await;
        h.github.accept("ghp_abc", Some("octocat"));
        h.service.save_token(&uid("u1"), "ghp_abc").await.expect("saved");

        assert!(h.service.remove(&uid("u1")).await.expect("removed"));
        assert_eq!(h.store.find_secret_by_owner(&uid("u1")).await.unwrap(), None);
        assert!(!h.service.remove(&uid("u1")).await.expect("idempotent"));
    }

    #[tokio::test]
    async fn code_linking_requires_oauth_app() {
        let h = Harness::new().with_user("u1").await;
        assert_eq!(
            h.service.link_with_code(&uid("u1"), "good-code").await.unwrap_err(),
            AccountError::OAuthUnavailable
        );
    }

    #[tokio::test]
    async fn code_linking_saves_exchanged_token() {
        let h = Harness::new().with_user("u1").await;
        h.github.accept("ghp_from_code", Some("octocat"));
        let service = h.service.clone().with_code_exchanger(Arc::new(FakeExchanger));

        service
            .link_with_code(&uid("u1"), "good-code")
            .await
            .expect("linked");
        assert_eq!(
            service.token_for_user(&uid("u1")).await.expect("readable"),
            "ghp_from_code"
        );

        assert!(matches!(
            service.link_with_code(&uid("u1"), "stale-code").await,
            Err(AccountError::Upstream { .. })
        ));
    }

    /// Holds `validate` until the test opens the gate.
    #[derive(Default)]
    struct GatedGithub {
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl TokenProvider for GatedGithub {
        async fn validate(&self, _token: &str) -> Result<bool, Report<GithubError>> {
            self.gate.notified().await;
            Ok(true)
        }

        async fn resolve_username(
            &self,
            _token: &str,
        ) -> Result<Option<String>, Report<GithubError>> {
            Ok(Some("octocat".to_string()))
        }
    }

    #[tokio::test]
    async fn patch_landing_during_token_link_is_kept() {
        let github = Arc::new(GatedGithub::default());
        let service = AccountService::new(
            Arc::new(MemoryAccountStore::new()),
            VAULT.clone(),
            github.clone(),
        );
        service.create(new_user("u1")).await.expect("user created");
        let id = uid("u1");

        let (linked, patched) = tokio::join!(service.save_token(&id, "ghp_abc"), async {
            let patched = service
                .update(
                    &id,
                    UserUpdate {
                        is_premium: Some(true),
                        ..UserUpdate::default()
                    },
                )
                .await;
            github.gate.notify_one();
            patched
        });
        linked.expect("token linked");
        assert!(patched.expect("patched").is_premium);

        let user = service
            .find_one(&id)
            .await
            .expect("lookup")
            .expect("present");
        assert!(user.is_premium);
        assert_eq!(user.github_user_name.as_deref(), Some("octocat"));
        assert!(user.github_token_id.is_some());
    }
}
