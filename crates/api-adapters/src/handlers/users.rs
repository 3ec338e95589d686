use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use domains::{User, UserPatch, UserProfile};

use super::{body, creation_response};
use crate::error::ApiError;
use crate::AppState;

pub async fn create(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
    payload: Result<Json<UserProfile>, JsonRejection>,
) -> Result<Response, ApiError> {
    let profile = body(payload)?;
    let outcome = state.services.users.create(&nickname, profile).await?;
    Ok(creation_response(outcome))
}

pub async fn profile(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.services.users.get(&nickname).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let patch = body(payload)?;
    Ok(Json(state.services.users.update(&nickname, patch).await?))
}
