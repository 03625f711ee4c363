//! The access guard and the decisions it makes.

use crate::credential::ClientCredential;
use crate::error::{GuardError, VerificationError};
use crate::headers::{
    CLIENT_ID, CLIENT_SECRET, RequestHeaders, extract_bearer_token, is_local_origin,
    is_well_formed_request,
};
use crate::policy::RoutePolicy;
use crate::verifier::{IdentityVerifier, VerifiedIdentity};
use rootcause::prelude::Report;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, info_span, warn};

/// Everything the guard needs, passed in explicitly at startup.
#[derive(Clone)]
pub struct GuardConfig {
    /// Credential pair trusted on the loopback origin.
    pub client_credential: ClientCredential,
    /// Verifier for bearer identity tokens.
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Upper bound on a single verification call.
    pub verification_timeout: Duration,
}

impl GuardConfig {
    /// Creates a guard configuration.
    #[must_use]
    pub fn new(
        client_credential: ClientCredential,
        verifier: Arc<dyn IdentityVerifier>,
        verification_timeout: Duration,
    ) -> Self {
        Self {
            client_credential,
            verifier,
            verification_timeout,
        }
    }
}

impl fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardConfig")
            .field("client_credential", &self.client_credential)
            .field("verification_timeout", &self.verification_timeout)
            .finish_non_exhaustive()
    }
}

/// Who was let in.
#[derive(Clone, PartialEq, Eq)]
pub enum AccessGrant {
    /// A trusted internal client on the loopback origin.
    Internal { client_id: String },
    /// A caller whose identity token the provider vouched for.
    Identity { subject: String, token: String },
}

impl AccessGrant {
    /// The identity provider's subject, for identity grants.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Internal { .. } => None,
            Self::Identity { subject, .. } => Some(subject),
        }
    }
}

impl fmt::Debug for AccessGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal { client_id } => f
                .debug_struct("Internal")
                .field("client_id", client_id)
                .finish(),
            Self::Identity { subject, .. } => f
                .debug_struct("Identity")
                .field("subject", subject)
                .finish_non_exhaustive(),
        }
    }
}

impl fmt::Display for AccessGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal { client_id } => write!(f, "client:{client_id}"),
            Self::Identity { subject, .. } => write!(f, "user:{subject}"),
        }
    }
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No usable credentials were presented.
    MissingCredentials,
    /// The identity provider did not accept the token.
    VerificationFailed,
    /// The identity provider did not answer in time.
    VerificationTimedOut,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "missing credentials"),
            Self::VerificationFailed => write!(f, "identity verification failed"),
            Self::VerificationTimedOut => write!(f, "identity verification timed out"),
        }
    }
}

/// The outcome of a guard check. There are no partial grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AccessGrant),
    Deny(DenyReason),
}

impl Decision {
    /// Returns true for [`Decision::Allow`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

/// Decides whether a request may proceed.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    config: GuardConfig,
}

impl AccessGuard {
    /// Creates a guard from explicit configuration.
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        if !config.client_credential.is_configured() {
            debug!("no client credential configured; loopback bypass disabled");
        }
        Self { config }
    }

    /// Decides on a request from its headers.
    ///
    /// Loopback callers with the configured client pair are let in first.
    /// Everyone else, including loopback callers without a valid pair, needs a
    /// verified bearer token.
    ///
    /// # Errors
    ///
    /// Returns a malformed-header [`GuardError`] when the `Authorization`
    /// header is present but not `Bearer <token>`. Missing credentials and
    /// rejected tokens resolve to [`Decision::Deny`] instead.
    pub async fn can_activate<H>(&self, headers: &H) -> Result<Decision, GuardError>
    where
        H: RequestHeaders + Sync + ?Sized,
    {
        if is_local_origin(headers) {
            if let Some(client_id) = self.matching_client(headers) {
                return Ok(Decision::Allow(AccessGrant::Internal { client_id }));
            }
            debug!("loopback request without a valid client credential");
        }

        if !is_well_formed_request(Some(headers)) {
            return Ok(Decision::Deny(DenyReason::MissingCredentials));
        }

        let token = extract_bearer_token(Some(headers))?;
        match self.verify_within_deadline(token).await {
            Ok(identity) => Ok(Decision::Allow(AccessGrant::Identity {
                subject: identity.subject().to_string(),
                token: token.to_string(),
            })),
            Err(report) => {
                if let VerificationError::TimedOut { after_ms } = report.current_context() {
                    warn!(timeout_ms = *after_ms as u64, "identity token verification timed out");
                    Ok(Decision::Deny(DenyReason::VerificationTimedOut))
                } else {
                    warn!(error = %report, "identity token verification failed");
                    Ok(Decision::Deny(DenyReason::VerificationFailed))
                }
            }
        }
    }

    /// Runs [`can_activate`](Self::can_activate) inside a span describing the
    /// route and logs the outcome.
    ///
    /// # Errors
    ///
    /// Same as [`can_activate`](Self::can_activate).
    pub async fn check<H>(
        &self,
        headers: &H,
        policy: &RoutePolicy,
        resource_id: Option<&str>,
    ) -> Result<Decision, GuardError>
    where
        H: RequestHeaders + Sync + ?Sized,
    {
        let span = info_span!(
            "access_guard",
            resource = policy.resource_name(),
            resource_id = resource_id.unwrap_or_default(),
        );

        async {
            let decision = self.can_activate(headers).await;
            match &decision {
                Ok(Decision::Allow(grant)) => debug!(caller = %grant, "access granted"),
                Ok(Decision::Deny(reason)) => warn!(%reason, "access denied"),
                Err(error) => warn!(%error, "malformed authorization header"),
            }
            decision
        }
        .instrument(span)
        .await
    }

    /// Returns true if the identity provider accepts `token`.
    pub async fn is_valid_identity_token(&self, token: &str) -> bool {
        match self.verify_within_deadline(token).await {
            Ok(_) => true,
            Err(report) => {
                warn!(error = %report, "caught error verifying identity token");
                false
            }
        }
    }

    /// Resolves the subject (`uid`) asserted by `token`.
    ///
    /// # Errors
    ///
    /// Propagates the verifier's error, or a timeout.
    pub async fn user_id_from_token(
        &self,
        token: &str,
    ) -> Result<String, Report<VerificationError>> {
        let identity = self.verify_within_deadline(token).await.inspect_err(|report| {
            warn!(error = %report, "caught error verifying identity token");
        })?;
        Ok(identity.subject().to_string())
    }

    fn matching_client<H>(&self, headers: &H) -> Option<String>
    where
        H: RequestHeaders + ?Sized,
    {
        let credential = &self.config.client_credential;
        let client_id = headers.header(CLIENT_ID)?;
        let client_secret = headers.header(CLIENT_SECRET)?;
        credential
            .matches(client_id, client_secret)
            .then(|| client_id.to_string())
    }

    async fn verify_within_deadline(
        &self,
        token: &str,
    ) -> Result<VerifiedIdentity, Report<VerificationError>> {
        let timeout = self.config.verification_timeout;
        match tokio::time::timeout(timeout, self.config.verifier.verify(token)).await {
            Ok(result) => result,
            Err(_) => Err(VerificationError::TimedOut {
                after_ms: timeout.as_millis(),
            }
            .into()),
        }
    }
}
