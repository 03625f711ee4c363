//! Error types for the vault crate.

use std::fmt;

/// Errors from sealing and opening secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// No passphrase was configured.
    MissingPassphrase,
    /// Key derivation rejected its parameters.
    KeyDerivation {
        /// What the KDF reported.
        reason: String,
    },
    /// The stored IV does not have the length the cipher needs.
    InvalidIv {
        /// Length the cipher requires.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPassphrase => write!(f, "vault passphrase is not configured"),
            Self::KeyDerivation { reason } => write!(f, "key derivation failed: {reason}"),
            Self::InvalidIv { expected, actual } => {
                write!(f, "invalid iv: expected {expected} bytes but got {actual}")
            }
        }
    }
}

impl std::error::Error for VaultError {}
