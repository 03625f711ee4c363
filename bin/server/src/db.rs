//! PostgreSQL-backed account store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octolink_accounts::{AccountStore, EncryptedSecret, StoreError, User};
use octolink_core::{SecretId, UserId};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::instrument;

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    user_id: String,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
    email: Option<String>,
    is_email_verified: bool,
    is_active: bool,
    is_premium: bool,
    github_token_id: Option<String>,
    github_user_name: Option<String>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, StoreError> {
        let user_id = decode_user_id(&self.user_id)?;
        let github_token_id = self
            .github_token_id
            .as_deref()
            .map(decode_secret_id)
            .transpose()?;

        Ok(User {
            user_id,
            created_at: self.created_at,
            last_updated_at: self.last_updated_at,
            email: self.email,
            is_email_verified: self.is_email_verified,
            is_active: self.is_active,
            is_premium: self.is_premium,
            github_token_id,
            github_user_name: self.github_user_name,
        })
    }
}

/// Row type for encrypted token queries.
#[derive(FromRow)]
struct SecretRow {
    id: String,
    value: Vec<u8>,
    iv: Vec<u8>,
    owner_id: String,
}

impl SecretRow {
    fn try_into_secret(self) -> Result<EncryptedSecret, StoreError> {
        Ok(EncryptedSecret {
            id: decode_secret_id(&self.id)?,
            value: self.value,
            iv: self.iv,
            owner_id: decode_user_id(&self.owner_id)?,
        })
    }
}

fn decode_user_id(raw: &str) -> Result<UserId, StoreError> {
    UserId::from_str(raw).map_err(|e| StoreError::Backend {
        details: format!("invalid user id '{raw}': {e}"),
    })
}

fn decode_secret_id(raw: &str) -> Result<SecretId, StoreError> {
    SecretId::from_str(raw).map_err(|e| StoreError::Backend {
        details: format!("invalid secret id '{raw}': {e}"),
    })
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend {
        details: e.to_string(),
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

const USER_COLUMNS: &str = "user_id, created_at, last_updated_at, email, is_email_verified, \
     is_active, is_premium, github_token_id, github_user_name";

/// [`AccountStore`] over the `users` and `encrypted_tokens` tables.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Creates a new store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, created_at, last_updated_at, email, is_email_verified,
                               is_active, is_premium, github_token_id, github_user_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.user_id.as_str())
        .bind(user.created_at)
        .bind(user.last_updated_at)
        .bind(&user.email)
        .bind(user.is_email_verified)
        .bind(user.is_active)
        .bind(user.is_premium)
        .bind(user.github_token_id.map(|id| id.to_string()))
        .bind(&user.github_user_name)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate {
                    user_id: user.user_id.clone(),
                }
            } else {
                backend(e)
            }
        })?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at"))
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;

        rows.into_iter().map(UserRow::try_into_user).collect()
    }

    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"))
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        row.map(UserRow::try_into_user).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        // github_token_id and github_user_name belong to link_secret.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_updated_at = $2, email = $3, is_email_verified = $4, is_active = $5,
                is_premium = $6
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_str())
        .bind(user.last_updated_at)
        .bind(&user.email)
        .bind(user.is_email_verified)
        .bind(user.is_active)
        .bind(user.is_premium)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound {
                user_id: user.user_id.clone(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self, username))]
    async fn link_secret(
        &self,
        user_id: &UserId,
        secret_id: SecretId,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET github_token_id = $2, github_user_name = $3, last_updated_at = $4
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .bind(secret_id.to_string())
        .bind(username)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound {
                user_id: user_id.clone(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: &UserId) -> Result<bool, StoreError> {
        // encrypted_tokens rows go with the user via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_secret_by_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Option<EncryptedSecret>, StoreError> {
        let row: Option<SecretRow> = sqlx::query_as(
            "SELECT id, value, iv, owner_id FROM encrypted_tokens WHERE owner_id = $1",
        )
        .bind(owner_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(SecretRow::try_into_secret).transpose()
    }

    #[instrument(skip(self, secret), fields(owner_id = %secret.owner_id))]
    async fn upsert_secret(&self, secret: &EncryptedSecret) -> Result<EncryptedSecret, StoreError> {
        let row: SecretRow = sqlx::query_as(
            r#"
            INSERT INTO encrypted_tokens (id, value, iv, owner_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (owner_id) DO UPDATE SET value = EXCLUDED.value, iv = EXCLUDED.iv
            RETURNING id, value, iv, owner_id
            "#,
        )
        .bind(secret.id.to_string())
        .bind(&secret.value)
        .bind(&secret.iv)
        .bind(secret.owner_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::UserNotFound {
                    user_id: secret.owner_id.clone(),
                }
            } else {
                backend(e)
            }
        })?;

        row.try_into_secret()
    }
}
