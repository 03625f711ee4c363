//! Header predicates used by the guard.
//!
//! Two ways to look at the `Authorization` header are exposed on purpose:
//! [`is_well_formed_request`] only asks whether something non-blank is there
//! and never fails, while [`extract_bearer_token`] insists on the exact
//! `Bearer <token>` shape and reports why it could not find one.

use crate::error::GuardError;
use http::HeaderMap;

/// The `Authorization` request header.
pub const AUTHORIZATION: &str = "authorization";
/// The forwarded-for header inspected for loopback origin.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
/// Header carrying the internal client's ID.
pub const CLIENT_ID: &str = "client_id";
/// Header carrying the internal client's secret.
pub const CLIENT_SECRET: &str = "client_secret";
/// The only forwarded-for value treated as local.
pub const LOOPBACK_ADDRESS: &str = "127.0.0.1";
/// The only accepted authorization scheme.
pub const BEARER_SCHEME: &str = "Bearer";

/// Read access to request headers by lowercase name.
pub trait RequestHeaders {
    /// Returns the header value, or `None` if absent or not visible ASCII.
    fn header(&self, name: &str) -> Option<&str>;
}

impl RequestHeaders for HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Returns true if the request was forwarded from the loopback address.
pub fn is_local_origin<H: RequestHeaders + ?Sized>(headers: &H) -> bool {
    headers.header(X_FORWARDED_FOR) == Some(LOOPBACK_ADDRESS)
}

/// Returns true if a non-blank `Authorization` header is present.
///
/// Never fails: an absent request, an absent header, or a blank one all
/// answer `false`.
pub fn is_well_formed_request<H: RequestHeaders + ?Sized>(headers: Option<&H>) -> bool {
    headers
        .and_then(|h| h.header(AUTHORIZATION))
        .is_some_and(|value| !value.trim().is_empty())
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// The header is split on single spaces, so doubled or leading spaces change
/// the part count.
///
/// # Errors
///
/// - [`GuardError::MissingContext`] if there is no request
/// - [`GuardError::MissingAuthorization`] if the header is absent
/// - [`GuardError::InvalidPartCount`] unless there are exactly two parts
/// - [`GuardError::InvalidScheme`] unless the first part is `Bearer`
pub fn extract_bearer_token<H: RequestHeaders + ?Sized>(
    headers: Option<&H>,
) -> Result<&str, GuardError> {
    let headers = headers.ok_or(GuardError::MissingContext)?;
    let value = headers
        .header(AUTHORIZATION)
        .ok_or(GuardError::MissingAuthorization)?;

    let parts: Vec<&str> = value.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(GuardError::InvalidPartCount {
            actual: parts.len(),
        });
    };
    if *scheme != BEARER_SCHEME {
        return Err(GuardError::InvalidScheme {
            scheme: (*scheme).to_string(),
        });
    }
    Ok(*token)
}
