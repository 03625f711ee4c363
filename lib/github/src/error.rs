//! Error types for the GitHub crate.

use std::fmt;

/// Errors from talking to GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GithubError {
    /// The HTTP client could not be built or a URL is invalid.
    Configuration {
        /// Which setting was rejected, and why.
        reason: String,
    },
    /// The request never got a response.
    Transport {
        /// The underlying client error.
        reason: String,
    },
    /// GitHub answered with a status this client does not handle.
    UnexpectedStatus {
        /// The API path that was called.
        endpoint: &'static str,
        /// The HTTP status GitHub returned.
        status: u16,
    },
    /// The response body could not be decoded.
    Decode {
        /// The decoder's complaint.
        reason: String,
    },
    /// The authorization code could not be exchanged for a token.
    TokenExchange {
        /// The OAuth error reported by the token endpoint.
        reason: String,
    },
}

impl fmt::Display for GithubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => write!(f, "github client misconfigured: {reason}"),
            Self::Transport { reason } => write!(f, "github request failed: {reason}"),
            Self::UnexpectedStatus { endpoint, status } => {
                write!(f, "github {endpoint} returned unexpected status {status}")
            }
            Self::Decode { reason } => write!(f, "failed to decode github response: {reason}"),
            Self::TokenExchange { reason } => {
                write!(f, "github code exchange failed: {reason}")
            }
        }
    }
}

impl std::error::Error for GithubError {}
