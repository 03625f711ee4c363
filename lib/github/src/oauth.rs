//! GitHub OAuth app: exchanges authorization codes for access tokens.

use crate::error::GithubError;
use crate::provider::CodeExchanger;
use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{AuthType, AuthorizationCode, ClientId, ClientSecret, TokenResponse, TokenUrl};
use rootcause::prelude::Report;
use std::fmt;
use tracing::{debug, instrument, warn};

/// GitHub's OAuth token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

/// A registered GitHub OAuth app.
#[derive(Clone)]
pub struct GithubOAuthApp {
    client_id: ClientId,
    client_secret: ClientSecret,
    token_url: TokenUrl,
    http: reqwest::Client,
}

impl fmt::Debug for GithubOAuthApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubOAuthApp")
            .field("client_id", &self.client_id.as_str())
            .field("token_url", &self.token_url.as_str())
            .finish_non_exhaustive()
    }
}

impl GithubOAuthApp {
    /// Creates an OAuth app client.
    ///
    /// # Errors
    ///
    /// Returns an error if `token_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self, Report<GithubError>> {
        let token_url = TokenUrl::new(token_url.into()).map_err(|e| GithubError::Configuration {
            reason: format!("invalid token URL: {e}"),
        })?;

        // Token endpoints must not be followed across redirects.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GithubError::Configuration {
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client_id: ClientId::new(client_id.into()),
            client_secret: ClientSecret::new(client_secret.into()),
            token_url,
            http,
        })
    }
}

#[async_trait]
impl CodeExchanger for GithubOAuthApp {
    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<String, Report<GithubError>> {
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(self.token_url.clone());

        let token = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                warn!(error = %e, "github code exchange failed");
                GithubError::TokenExchange {
                    reason: e.to_string(),
                }
            })?;

        debug!("exchanged github authorization code");
        Ok(token.access_token().secret().clone())
    }
}
