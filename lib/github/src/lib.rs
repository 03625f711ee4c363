//! GitHub integration for octolink.
//!
//! [`GithubClient`] checks that an access token is still good for repository
//! access and resolves the login it belongs to. [`GithubOAuthApp`] turns the
//! authorization code from GitHub's OAuth redirect into an access token.
//!
//! The account service only sees the [`TokenProvider`] and [`CodeExchanger`]
//! capabilities, so tests can swap in fakes.

mod client;
mod error;
mod oauth;
mod provider;

pub use client::{DEFAULT_API_BASE_URL, GithubClient, REQUIRED_SCOPE};
pub use error::GithubError;
pub use oauth::{DEFAULT_TOKEN_URL, GithubOAuthApp};
pub use provider::{CodeExchanger, TokenProvider};
