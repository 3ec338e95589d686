use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use domains::{NewThread, Thread, ThreadPatch, Vote};

use super::{body, creation_response};
use crate::error::ApiError;
use crate::AppState;

pub async fn create(
    State(state): State<AppState>,
    Path(forum): Path<String>,
    payload: Result<Json<NewThread>, JsonRejection>,
) -> Result<Response, ApiError> {
    let draft = body(payload)?;
    let outcome = state.services.threads.create(&forum, draft).await?;
    Ok(creation_response(outcome))
}

pub async fn details(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
) -> Result<Json<Thread>, ApiError> {
    Ok(Json(state.services.threads.resolve(&slug_or_id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
    payload: Result<Json<ThreadPatch>, JsonRejection>,
) -> Result<Json<Thread>, ApiError> {
    let patch = body(payload)?;
    Ok(Json(state.services.threads.update(&slug_or_id, patch).await?))
}

pub async fn vote(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
    payload: Result<Json<Vote>, JsonRejection>,
) -> Result<Json<Thread>, ApiError> {
    let vote = body(payload)?;
    Ok(Json(state.services.threads.vote(&slug_or_id, vote).await?))
}
