use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::ServiceStatus;

use crate::error::ApiError;
use crate::AppState;

pub async fn status(State(state): State<AppState>) -> Result<Json<ServiceStatus>, ApiError> {
    Ok(Json(state.services.status.status().await?))
}

pub async fn clear(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.services.status.clear().await?;
    Ok(StatusCode::OK)
}
