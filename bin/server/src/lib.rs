//! octolink HTTP service.
//!
//! Serves the `users` resource under `/api`. Every route except
//! `/api/health` sits behind the access guard.

pub mod config;
pub mod db;
pub mod error;
pub mod firebase;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use octolink_guard::RoutePolicy;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{Gate, require_access};
use crate::state::AppState;

/// Policy shared by the `users` routes; `{id}` names the user.
pub const USERS_POLICY: RoutePolicy = RoutePolicy::resource("users").with_resource_id("id");

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let gate = Gate::new(state.guard.clone(), USERS_POLICY);

    let users = Router::new()
        .route("/users", post(routes::create).get(routes::find_all))
        .route(
            "/users/{id}",
            get(routes::find_one)
                .patch(routes::update)
                .delete(routes::remove),
        )
        .route("/users/{id}/token", get(routes::token))
        .route("/users/{id}/validToken", get(routes::valid_token))
        .route("/users/{id}/code", post(routes::link_code))
        .route("/users/{id}/githubUsername", get(routes::github_username))
        .route_layer(from_fn_with_state(gate, require_access));

    let api = Router::new()
        .route("/health", get(routes::health))
        .merge(users);

    Router::new()
        .nest("/api", api)
        .layer(from_fn_with_state(state.environment, error::render_errors))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
