//! REST client for the parts of the GitHub API the service uses.

use crate::error::GithubError;
use crate::provider::TokenProvider;
use async_trait::async_trait;
use reqwest::StatusCode;
use rootcause::prelude::Report;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Public GitHub REST endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Scope a token must carry to be useful to the service.
pub const REQUIRED_SCOPE: &str = "repo";

const OAUTH_SCOPES_HEADER: &str = "x-oauth-scopes";
const USER_AGENT: &str = concat!("octolink/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: Option<String>,
}

/// Talks to the GitHub REST API with a caller-supplied token.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
}

impl GithubClient {
    /// Creates a client against `api_base` (normally [`DEFAULT_API_BASE_URL`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_base: impl Into<String>) -> Result<Self, Report<GithubError>> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GithubError::Configuration {
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, token: &str) -> Result<reqwest::Response, GithubError> {
        self.http
            .get(format!("{}{path}", self.api_base))
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GithubError::Transport {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl TokenProvider for GithubClient {
    #[instrument(skip(self, token))]
    async fn validate(&self, token: &str) -> Result<bool, Report<GithubError>> {
        let response = self.get("/", token).await?;

        match response.status() {
            StatusCode::OK => {
                let scopes = response
                    .headers()
                    .get(OAUTH_SCOPES_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                let valid = has_required_scope(scopes);
                debug!(valid, "checked token scopes");
                Ok(valid)
            }
            StatusCode::UNAUTHORIZED => {
                debug!("github rejected token");
                Ok(false)
            }
            status => {
                warn!(status = status.as_u16(), "unexpected status validating token");
                Err(GithubError::UnexpectedStatus {
                    endpoint: "/",
                    status: status.as_u16(),
                }
                .into())
            }
        }
    }

    #[instrument(skip(self, token))]
    async fn resolve_username(&self, token: &str) -> Result<Option<String>, Report<GithubError>> {
        let response = self.get("/user", token).await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "unexpected status resolving username");
            return Err(GithubError::UnexpectedStatus {
                endpoint: "/user",
                status: status.as_u16(),
            }
            .into());
        }

        let user: UserResponse = response.json().await.map_err(|e| GithubError::Decode {
            reason: e.to_string(),
        })?;
        Ok(user.login.filter(|login| !login.is_empty()))
    }
}

/// Returns true if a comma-separated scope list contains [`REQUIRED_SCOPE`].
fn has_required_scope(scopes: &str) -> bool {
    scopes
        .split(',')
        .any(|scope| scope.trim().eq_ignore_ascii_case(REQUIRED_SCOPE))
}
