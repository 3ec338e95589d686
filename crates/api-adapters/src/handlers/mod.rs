//! Request handlers, one module per resource.

pub mod forums;
pub mod posts;
pub mod service;
pub mod threads;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::Creation;
use serde::Serialize;

use crate::error::ApiError;

/// Unwraps a JSON body, turning rejections into `400 {"message": ...}`.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}

/// `201` with the new entity, or `409` with whatever it clashed with.
pub(crate) fn creation_response<T: Serialize, E: Serialize>(outcome: Creation<T, E>) -> Response {
    match outcome {
        Creation::Created(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Creation::AlreadyExists(existing) => (StatusCode::CONFLICT, Json(existing)).into_response(),
    }
}
