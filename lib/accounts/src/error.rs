//! Error types for the accounts crate.
//!
//! - `StoreError`: persistence failures, raised by [`AccountStore`](crate::AccountStore)
//! - `AccountError`: what account operations report to their callers

use octolink_core::UserId;
use std::fmt;

/// Errors from account storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A user with this ID already exists.
    Duplicate {
        /// The ID that is taken.
        user_id: UserId,
    },
    /// No user with this ID exists.
    UserNotFound {
        /// The ID that was looked up.
        user_id: UserId,
    },
    /// The backing store failed.
    Backend {
        /// The driver's error message.
        details: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { user_id } => write!(f, "user '{user_id}' already exists"),
            Self::UserNotFound { user_id } => write!(f, "user '{user_id}' not found"),
            Self::Backend { details } => write!(f, "account store error: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from account operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// No user with this ID exists.
    UserNotFound {
        /// The ID that was looked up.
        user_id: UserId,
    },
    /// The user has no stored token, or the stored token is no longer valid.
    TokenNotFound,
    /// A user with this ID already exists.
    Duplicate {
        /// The ID that is taken.
        user_id: UserId,
    },
    /// GitHub did not accept the token being linked.
    InvalidToken,
    /// GitHub could not be consulted or gave an unusable answer.
    Upstream {
        /// Message shown to the caller.
        details: String,
    },
    /// No GitHub OAuth app is configured.
    OAuthUnavailable,
    /// A stored secret could not be opened.
    Vault {
        /// What the vault reported.
        details: String,
    },
    /// The account store failed.
    Storage {
        /// What the store reported.
        details: String,
    },
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserNotFound { user_id } => write!(f, "User {user_id} not found"),
            Self::TokenNotFound => write!(f, "Token for user not found"),
            Self::Duplicate { .. } => write!(f, "Duplicate record"),
            Self::InvalidToken => write!(f, "Token retrieved using code was invalid"),
            Self::Upstream { details } => write!(f, "{details}"),
            Self::OAuthUnavailable => write!(f, "GitHub OAuth is not configured"),
            Self::Vault { details } => write!(f, "stored token could not be opened: {details}"),
            Self::Storage { details } => write!(f, "account storage failed: {details}"),
        }
    }
}

impl std::error::Error for AccountError {}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { user_id } => Self::Duplicate { user_id },
            StoreError::UserNotFound { user_id } => Self::UserNotFound { user_id },
            StoreError::Backend { details } => Self::Storage { details },
        }
    }
}
