//! Request access guard for octolink.
//!
//! The guard makes a binary allow/deny decision from request headers:
//!
//! - A caller on the loopback origin (`x-forwarded-for: 127.0.0.1`) that
//!   presents the configured `client_id` / `client_secret` pair is admitted
//!   as an internal client.
//! - Everyone else must present `Authorization: Bearer <token>`, and the token
//!   must pass the configured [`IdentityVerifier`].
//!
//! A header that is present but not shaped like `Bearer <token>` is a
//! [`GuardError`], not a denial, so the transport can answer it differently
//! from rejected credentials.
//!
//! # Example
//!
//! ```
//! use octolink_guard::{AccessGuard, ClientCredential, GuardConfig, IdentityVerifier,
//!     VerificationError, VerifiedIdentity};
//! use http::HeaderMap;
//! use rootcause::prelude::Report;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct AcceptAll;
//!
//! #[async_trait::async_trait]
//! impl IdentityVerifier for AcceptAll {
//!     async fn verify(&self, _token: &str) -> Result<VerifiedIdentity, Report<VerificationError>> {
//!         Ok(VerifiedIdentity::new("uid-1"))
//!     }
//! }
//!
//! # tokio_test_block_on(async {
//! let guard = AccessGuard::new(GuardConfig::new(
//!     ClientCredential::new("generator", "s3cret"),
//!     Arc::new(AcceptAll),
//!     Duration::from_secs(5),
//! ));
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("authorization", "Bearer abc".parse().unwrap());
//! assert!(guard.can_activate(&headers).await.unwrap().is_allowed());
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

mod credential;
mod error;
mod guard;
mod headers;
mod policy;
mod verifier;

pub use credential::ClientCredential;
pub use error::{GuardError, VerificationError};
pub use guard::{AccessGrant, AccessGuard, Decision, DenyReason, GuardConfig};
pub use headers::{
    AUTHORIZATION, BEARER_SCHEME, CLIENT_ID, CLIENT_SECRET, LOOPBACK_ADDRESS, RequestHeaders,
    X_FORWARDED_FOR, extract_bearer_token, is_local_origin, is_well_formed_request,
};
pub use policy::RoutePolicy;
pub use verifier::{IdentityVerifier, VerifiedIdentity};
