//! HTTP handlers for the `users` resource.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use octolink_accounts::{NewUser, User, UserUpdate};
use octolink_core::UserId;
use octolink_guard::AccessGrant;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Body of `POST /users/{id}/code`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeRequest {
    pub code: String,
}

/// Result of a delete.
#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub affected: u64,
}

fn user_id(raw: String) -> Result<UserId, ApiError> {
    UserId::new(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AccessGrant>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let new = body(payload)?;
    debug!(%caller, user_id = %new.user_id, "creating user");
    let user = state.accounts.create(new).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn find_all(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.accounts.find_all().await?))
}

pub async fn find_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.accounts.find_one(&user_id(id)?).await?;
    Ok((
        [(header::CACHE_CONTROL, "private, max-age=10")],
        Json(user),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let id = user_id(id)?;
    let update = body(payload)?;
    Ok(Json(state.accounts.update(&id, update).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<AccessGrant>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    let id = user_id(id)?;
    debug!(%caller, user_id = %id, "removing user");
    let removed = state.accounts.remove(&id).await?;
    Ok(Json(DeleteResult {
        affected: u64::from(removed),
    }))
}

pub async fn token(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>, ApiError> {
    Ok(Json(state.accounts.token_for_user(&user_id(id)?).await?))
}

pub async fn valid_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(state.accounts.has_valid_token(&user_id(id)?).await?))
}

pub async fn link_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let id = user_id(id)?;
    let CodeRequest { code } = body(payload)?;
    state.accounts.link_with_code(&id, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn github_username(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<String>>, ApiError> {
    Ok(Json(state.accounts.github_username(&user_id(id)?).await?))
}
