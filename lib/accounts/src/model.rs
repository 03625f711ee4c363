//! Account records and the request bodies that create and patch them.

use chrono::{DateTime, Utc};
use octolink_core::{SecretId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user of the service, keyed by the identity provider's subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub email: Option<String>,
    pub is_email_verified: bool,
    pub is_active: bool,
    pub is_premium: bool,
    /// The user's sealed GitHub token, once one has been linked.
    pub github_token_id: Option<SecretId>,
    pub github_user_name: Option<String>,
}

impl User {
    /// Builds a fresh user record from a creation request.
    #[must_use]
    pub fn from_new(new: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            user_id: new.user_id,
            created_at: now,
            last_updated_at: now,
            email: new.email,
            is_email_verified: new.is_email_verified.unwrap_or(false),
            is_active: new.is_active.unwrap_or(true),
            is_premium: new.is_premium.unwrap_or(false),
            github_token_id: None,
            github_user_name: None,
        }
    }

    /// Applies the plain fields of a patch. The GitHub token, if any, is
    /// handled separately by the account service.
    pub fn apply(&mut self, update: &UserUpdate, now: DateTime<Utc>) {
        if let Some(email) = &update.email {
            self.email = Some(email.clone());
        }
        if let Some(verified) = update.is_email_verified {
            self.is_email_verified = verified;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        if let Some(premium) = update.is_premium {
            self.is_premium = premium;
        }
        self.last_updated_at = now;
    }
}

/// Body of a user creation request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_email_verified: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_premium: Option<bool>,
}

/// Body of a user patch request. Absent fields are left alone.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_email_verified: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_premium: Option<bool>,
    /// A plaintext GitHub token to validate, seal, and link.
    #[serde(default)]
    pub github_token: Option<String>,
}

impl fmt::Debug for UserUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserUpdate")
            .field("email", &self.email)
            .field("is_email_verified", &self.is_email_verified)
            .field("is_active", &self.is_active)
            .field("is_premium", &self.is_premium)
            .field("has_github_token", &self.github_token.is_some())
            .finish()
    }
}

/// A sealed secret at rest. Only the vault can turn `value` back into text.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedSecret {
    pub id: SecretId,
    pub value: Vec<u8>,
    pub iv: Vec<u8>,
    pub owner_id: UserId,
}

impl fmt::Debug for EncryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedSecret")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("value_len", &self.value.len())
            .finish_non_exhaustive()
    }
}
