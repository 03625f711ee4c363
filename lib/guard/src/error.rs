//! Error types for the guard crate.
//!
//! - `GuardError`: the request could not be judged at all (malformed input)
//! - `VerificationError`: the identity provider did not vouch for a token
//!
//! A denial is not an error; see [`Decision`](crate::Decision).

use std::fmt;

/// Errors raised while reading credentials out of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// There was no request to read headers from.
    MissingContext,
    /// The `Authorization` header is absent.
    MissingAuthorization,
    /// The `Authorization` header did not split into exactly two parts.
    InvalidPartCount {
        /// Number of space-separated parts found.
        actual: usize,
    },
    /// The `Authorization` header used a scheme other than `Bearer`.
    InvalidScheme {
        /// The scheme that was presented instead.
        scheme: String,
    },
}

impl GuardError {
    /// Returns true if the header was present but not shaped like `Bearer <token>`.
    #[must_use]
    pub fn is_malformed_header(&self) -> bool {
        matches!(
            self,
            Self::InvalidPartCount { .. } | Self::InvalidScheme { .. }
        )
    }
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingContext => write!(f, "request context is unavailable"),
            Self::MissingAuthorization => write!(f, "Authorization header is missing"),
            Self::InvalidPartCount { actual } => write!(
                f,
                "Authorization header is invalid, expected length to be 2 but was {actual}"
            ),
            Self::InvalidScheme { scheme } => write!(
                f,
                "Authorization header is invalid, expected first part to be \"Bearer\" but was {scheme}"
            ),
        }
    }
}

impl std::error::Error for GuardError {}

/// Errors from identity-token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The provider rejected the token (bad signature, expired, wrong audience).
    Rejected {
        /// Why the provider refused the token.
        reason: String,
    },
    /// The provider could not be consulted.
    Unavailable {
        /// What went wrong reaching the provider.
        reason: String,
    },
    /// The provider did not answer in time.
    TimedOut {
        /// The deadline that elapsed, in milliseconds.
        after_ms: u128,
    },
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { reason } => write!(f, "identity token rejected: {reason}"),
            Self::Unavailable { reason } => {
                write!(f, "identity provider unavailable: {reason}")
            }
            Self::TimedOut { after_ms } => {
                write!(f, "identity verification timed out after {after_ms}ms")
            }
        }
    }
}

impl std::error::Error for VerificationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_count_message_reports_observed_length() {
        let err = GuardError::InvalidPartCount { actual: 1 };
        assert_eq!(
            err.to_string(),
            "Authorization header is invalid, expected length to be 2 but was 1"
        );
        assert!(err.is_malformed_header());
    }

    #[test]
    fn scheme_message_names_observed_scheme() {
        let err = GuardError::InvalidScheme {
            scheme: "Basic".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Authorization header is invalid, expected first part to be \"Bearer\" but was Basic"
        );
        assert!(err.is_malformed_header());
    }

    #[test]
    fn missing_pieces_are_not_malformed_headers() {
        assert!(!GuardError::MissingContext.is_malformed_header());
        assert!(!GuardError::MissingAuthorization.is_malformed_header());
    }

    #[test]
    fn verification_error_display() {
        let err = VerificationError::Rejected {
            reason: "token expired".to_string(),
        };
        assert!(err.to_string().contains("rejected"));
        assert!(err.to_string().contains("token expired"));

        let err = VerificationError::TimedOut { after_ms: 250 };
        assert!(err.to_string().contains("250ms"));
    }
}
