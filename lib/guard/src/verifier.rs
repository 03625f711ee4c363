//! The identity-verification capability the guard depends on.

use crate::error::VerificationError;
use async_trait::async_trait;
use rootcause::prelude::Report;

/// What the identity provider vouches for once a token checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    subject: String,
}

impl VerifiedIdentity {
    /// Creates a verified identity for `subject`.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    /// The provider's subject identifier (`uid`).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Verifies bearer identity tokens against an identity provider.
///
/// Implementations must fail on any token the provider does not accept:
/// bad signature, expired, wrong audience or issuer.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verifies `token` and returns the identity it asserts.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, Report<VerificationError>>;
}
