use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{DomainError, NewPost, Post, PostDetails, PostId, PostPatch, Related};
use serde::Deserialize;
use services::{resolve_post_listing, RawListQuery};
use tracing::debug;

use super::body;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DetailsQuery {
    pub related: Option<String>,
}

fn post_id(raw: &str) -> Result<PostId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(DomainError::bad_request(format!("post id must be an integer, got `{raw}`"))))
}

/// Creates a batch of posts. The body is a JSON array; `[]` is accepted.
pub async fn create(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
    payload: Result<Json<Vec<NewPost>>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<Post>>), ApiError> {
    let drafts = body(payload)?;
    let thread = state.services.threads.resolve(&slug_or_id).await?;
    let created = state.services.posts.create_posts(&thread, drafts).await?;
    state.metrics.record_posts_created(created.len());
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
    Query(raw): Query<RawListQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let params = resolve_post_listing(&raw)?;
    debug!(?params, "resolved post listing");
    let thread = state.services.threads.resolve(&slug_or_id).await?;
    Ok(Json(state.services.posts.list_posts(thread.id, &params).await?))
}

pub async fn details(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DetailsQuery>,
) -> Result<Json<PostDetails>, ApiError> {
    let id = post_id(&id)?;
    let related = query
        .related
        .as_deref()
        .map(Related::parse_list)
        .unwrap_or_default();
    Ok(Json(state.services.posts.post_details(id, &related).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PostPatch>, JsonRejection>,
) -> Result<Json<Post>, ApiError> {
    let id = post_id(&id)?;
    let patch = body(payload)?;
    Ok(Json(state.services.posts.update_post(id, patch).await?))
}
