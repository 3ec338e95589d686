use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use domains::{Forum, NewForum, Thread, User};
use services::{resolve_page, RawListQuery};

use super::{body, creation_response};
use crate::error::ApiError;
use crate::AppState;

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewForum>, JsonRejection>,
) -> Result<Response, ApiError> {
    let draft = body(payload)?;
    let outcome = state.services.forums.create(draft).await?;
    Ok(creation_response(outcome))
}

pub async fn details(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Forum>, ApiError> {
    Ok(Json(state.services.forums.details(&slug).await?))
}

pub async fn threads(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(raw): Query<RawListQuery>,
) -> Result<Json<Vec<Thread>>, ApiError> {
    let page = resolve_page(&raw)?;
    Ok(Json(state.services.forums.list_threads(&slug, &page).await?))
}

pub async fn users(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(raw): Query<RawListQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let page = resolve_page(&raw)?;
    Ok(Json(state.services.forums.list_users(&slug, &page).await?))
}
