//! Error types for the server and their HTTP rendering.
//!
//! Handlers return [`ApiError`], which renders as
//! `{ "statusCode", "message" }`. In the development environment
//! [`render_errors`] widens the body with the request's method and path, a
//! timestamp, and the error's name.

use crate::config::Environment;
use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use octolink_accounts::AccountError;
use octolink_guard::GuardError;
use serde::Serialize;
use std::fmt;
use tracing::{error, warn};

/// Failures that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration is missing or invalid.
    Configuration {
        /// The offending setting and the problem with it.
        details: String,
    },
    /// The token vault could not be built.
    Vault {
        /// What the vault reported.
        details: String,
    },
    /// The database could not be reached or migrated.
    Database {
        /// The driver or migration error.
        details: String,
    },
    /// An outbound client could not be built.
    Client {
        /// Which client failed to build, and why.
        details: String,
    },
    /// The listener could not be bound or the server failed.
    Serve {
        /// The I/O error from the listener.
        details: String,
    },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "invalid configuration: {details}"),
            Self::Vault { details } => write!(f, "failed to initialize token vault: {details}"),
            Self::Database { details } => write!(f, "database error: {details}"),
            Self::Client { details } => write!(f, "failed to build client: {details}"),
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

/// An error on its way to becoming an HTTP response.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    name: &'static str,
    message: String,
}

/// Attached to error responses so [`render_errors`] can rebuild the body.
#[derive(Debug, Clone)]
struct ErrorDetails {
    name: &'static str,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    status_code: u16,
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailedErrorBody<'a> {
    status_code: u16,
    timestamp: String,
    path: &'a str,
    method: &'a str,
    error_name: &'a str,
    message: &'a str,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, name: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            name,
            message: message.into(),
        }
    }

    /// The caller was turned away by the access guard.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", "Unauthorized")
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        let message = err.to_string();
        match err {
            AccountError::UserNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "UserNotFound", message)
            }
            AccountError::TokenNotFound => {
                Self::new(StatusCode::NOT_FOUND, "TokenNotFound", message)
            }
            AccountError::Duplicate { .. } => {
                Self::new(StatusCode::CONFLICT, "Duplicate", message)
            }
            AccountError::InvalidToken => {
                Self::new(StatusCode::BAD_REQUEST, "InvalidToken", message)
            }
            AccountError::Upstream { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "Upstream", message)
            }
            AccountError::OAuthUnavailable => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "OAuthUnavailable", message)
            }
            AccountError::Vault { .. } | AccountError::Storage { .. } => {
                error!(error = %message, "account operation failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error",
                )
            }
        }
    }
}

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        if err.is_malformed_header() {
            Self::new(StatusCode::BAD_REQUEST, "MalformedAuthorization", err.to_string())
        } else {
            Self::unauthorized()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status_code: self.status.as_u16(),
            message: &self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorDetails {
            name: self.name,
            message: self.message,
        });
        response
    }
}

/// Logs every error response and, in development, widens its body.
pub async fn render_errors(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let details = response.extensions().get::<ErrorDetails>().cloned();
    let message = details.as_ref().map_or("", |d| d.message.as_str());
    if status.is_server_error() {
        error!(%method, %path, status = status.as_u16(), reason = message, "request failed");
    } else {
        warn!(%method, %path, status = status.as_u16(), reason = message, "request rejected");
    }

    let Some(details) = details.filter(|_| environment.is_development()) else {
        return response;
    };

    let body = DetailedErrorBody {
        status_code: status.as_u16(),
        timestamp: Utc::now().to_rfc3339(),
        path: &path,
        method: method.as_str(),
        error_name: details.name,
        message: &details.message,
    };
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONTENT_TYPE);
    let mut detailed = Json(body).into_response();
    *detailed.status_mut() = parts.status;
    detailed.headers_mut().extend(parts.headers);
    detailed
}

#[cfg(test)]
mod tests {
    use super::*;
    use octolink_core::UserId;

    #[test]
    fn account_errors_map_to_statuses() {
        let cases = [
            (AccountError::TokenNotFound, StatusCode::NOT_FOUND),
            (
                AccountError::Duplicate {
                    user_id: UserId::new("u1").expect("valid id"),
                },
                StatusCode::CONFLICT,
            ),
            (AccountError::InvalidToken, StatusCode::BAD_REQUEST),
            (
                AccountError::Upstream {
                    details: "Could not get GitHub username from token".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (AccountError::OAuthUnavailable, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_failures_hide_details() {
        let err = ApiError::from(AccountError::Storage {
            details: "password authentication failed for user \"octolink\"".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn malformed_header_is_bad_request() {
        let err = ApiError::from(GuardError::InvalidScheme {
            scheme: "Basic".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("but was Basic"));

        assert_eq!(
            ApiError::from(GuardError::MissingAuthorization).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
