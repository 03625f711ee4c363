//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested keys use a
//! double underscore, so `FIREBASE__PROJECT_ID` sets `firebase.project_id`.

use crate::error::StartupError;
use octolink_github::{DEFAULT_API_BASE_URL, DEFAULT_TOKEN_URL};
use octolink_guard::ClientCredential;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Deployment environment. Controls how much detail error bodies carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

/// Server configuration composed from the settings of each component.
#[derive(Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub environment: Environment,

    /// Passphrase the token vault derives its key from.
    pub secret_key: String,

    /// Credential pair trusted from the loopback origin.
    #[serde(default)]
    pub client: ClientConfig,

    pub firebase: FirebaseConfig,

    #[serde(default)]
    pub guard: GuardSettings,

    #[serde(default)]
    pub github: GithubConfig,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("environment", &self.environment)
            .field("client_id", &self.client.id)
            .field("firebase", &self.firebase)
            .field("guard", &self.guard)
            .field("github_api_base_url", &self.github.api_base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    pub id: Option<String>,
    pub secret: Option<String>,
}

impl ClientConfig {
    /// The configured pair, or a disabled one if either half is missing.
    #[must_use]
    pub fn credential(&self) -> ClientCredential {
        match (&self.id, &self.secret) {
            (Some(id), Some(secret)) => ClientCredential::new(id.clone(), secret.clone()),
            _ => ClientCredential::disabled(),
        }
    }
}

/// Firebase Authentication settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseConfig {
    pub project_id: String,

    /// Issuer prefix; the project ID is appended to form the token issuer.
    #[serde(default = "default_issuer_base_url")]
    pub issuer_base_url: String,

    /// Where the signing keys are published.
    #[serde(default = "default_jwks_url")]
    pub jwks_url: String,

    /// Maximum age of cached signing keys, in seconds.
    #[serde(default = "default_jwks_refresh_seconds")]
    pub jwks_refresh_seconds: u64,
}

impl FirebaseConfig {
    /// The `iss` claim tokens for this project carry.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!(
            "{}/{}",
            self.issuer_base_url.trim_end_matches('/'),
            self.project_id
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardSettings {
    /// Upper bound on one identity-token verification, in milliseconds.
    #[serde(default = "default_verification_timeout_ms")]
    pub verification_timeout_ms: u64,
}

impl GuardSettings {
    #[must_use]
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_ms)
    }
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            verification_timeout_ms: default_verification_timeout_ms(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_base_url")]
    pub api_base_url: String,

    /// OAuth app used to link accounts from authorization codes.
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,

    #[serde(default = "default_github_token_url")]
    pub token_url: String,
}

impl GithubConfig {
    /// The OAuth app's `(client_id, client_secret)`, if both are set.
    #[must_use]
    pub fn oauth_app(&self) -> Option<(&str, &str)> {
        match (&self.oauth_client_id, &self.oauth_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_github_api_base_url(),
            oauth_client_id: None,
            oauth_client_secret: None,
            token_url: default_github_token_url(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_issuer_base_url() -> String {
    "https://securetoken.google.com".to_string()
}

fn default_jwks_url() -> String {
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com"
        .to_string()
}

fn default_jwks_refresh_seconds() -> u64 {
    3600
}

fn default_verification_timeout_ms() -> u64 {
    5000
}

fn default_github_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_github_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    fn from_source(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Rejects settings the server cannot start with.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Configuration`] naming the offending setting.
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.secret_key.is_empty() {
            return Err(StartupError::Configuration {
                details: "SECRET_KEY must not be empty".to_string(),
            });
        }
        if self.firebase.project_id.trim().is_empty() {
            return Err(StartupError::Configuration {
                details: "FIREBASE__PROJECT_ID must not be empty".to_string(),
            });
        }

        let id_set = self.client.id.as_deref().is_some_and(|v| !v.is_empty());
        let secret_set = self.client.secret.as_deref().is_some_and(|v| !v.is_empty());
        if id_set != secret_set {
            return Err(StartupError::Configuration {
                details: "CLIENT__ID and CLIENT__SECRET must be set together".to_string(),
            });
        }

        if self.guard.verification_timeout_ms == 0 {
            return Err(StartupError::Configuration {
                details: "GUARD__VERIFICATION_TIMEOUT_MS must be positive".to_string(),
            });
        }
        Ok(())
    }
}
