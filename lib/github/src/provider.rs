//! Capabilities the account service needs from GitHub.

use crate::error::GithubError;
use async_trait::async_trait;
use rootcause::prelude::Report;

/// Validates GitHub access tokens and resolves who they belong to.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns true if `token` is live and carries the `repo` scope.
    async fn validate(&self, token: &str) -> Result<bool, Report<GithubError>>;

    /// Returns the login of the account `token` belongs to.
    async fn resolve_username(&self, token: &str) -> Result<Option<String>, Report<GithubError>>;
}

/// Turns an OAuth authorization code into an access token.
#[async_trait]
pub trait CodeExchanger: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<String, Report<GithubError>>;
}
