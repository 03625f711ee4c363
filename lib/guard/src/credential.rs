//! The shared client credential trusted on the loopback origin.

use std::fmt;

/// A `client_id` / `client_secret` pair configured out-of-band.
///
/// An unconfigured pair (either half empty) never matches, which turns the
/// loopback bypass off.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ClientCredential {
    client_id: String,
    client_secret: String,
}

impl ClientCredential {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// A pair that matches nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns the configured client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns true if both halves are configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Exact, case-sensitive comparison against presented values.
    #[must_use]
    pub fn matches(&self, client_id: &str, client_secret: &str) -> bool {
        self.is_configured() && self.client_id == client_id && self.client_secret == client_secret
    }
}

impl fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredential")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
