//! Access-guard middleware for Axum routes.

use crate::error::ApiError;
use axum::{
    extract::{RawPathParams, Request, State, rejection::RawPathParamsRejection},
    middleware::Next,
    response::{IntoResponse, Response},
};
use octolink_guard::{AccessGuard, Decision, RoutePolicy};
use std::sync::Arc;

/// The guard together with the policy of the routes it protects.
#[derive(Clone)]
pub struct Gate {
    guard: Arc<AccessGuard>,
    policy: RoutePolicy,
}

impl Gate {
    #[must_use]
    pub fn new(guard: Arc<AccessGuard>, policy: RoutePolicy) -> Self {
        Self { guard, policy }
    }
}

/// Lets a request through only if the guard allows it.
///
/// The [`AccessGrant`](octolink_guard::AccessGrant) is stored in the request
/// extensions for handlers. A denial is answered with 401; an `Authorization`
/// header that is not `Bearer <token>` with 400.
pub async fn require_access(
    State(gate): State<Gate>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let resource_id = gate.policy.resource_id_param().and_then(|name| {
        params.ok().and_then(|params| {
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        })
    });

    let decision = gate
        .guard
        .check(request.headers(), &gate.policy, resource_id.as_deref())
        .await;

    match decision {
        Ok(Decision::Allow(grant)) => {
            request.extensions_mut().insert(grant);
            next.run(request).await
        }
        Ok(Decision::Deny(_)) => ApiError::unauthorized().into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}
