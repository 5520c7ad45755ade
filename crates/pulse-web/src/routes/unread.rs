//! Pull API: unread count and read-state mutations.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use pulse_core::{EventId, UserId};

use crate::state::AppState;

#[derive(Serialize)]
pub struct UnreadResponse {
    pub count: u64,
}

#[derive(Deserialize)]
pub struct MarkReadRequest {
    pub item_id: EventId,
}

pub async fn get_unread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UnreadResponse>, (StatusCode, String)> {
    let count = state
        .store
        .unread_count(&UserId::new(id))
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    Ok(Json(UnreadResponse { count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MarkReadRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .store
        .mark_read(&UserId::new(id), &req.item_id)
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .store
        .mark_all_read(&UserId::new(id))
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace local state with the durable source of truth. Clients call
/// this on reconnect, before trusting any pre-reconnect local count.
pub async fn refresh(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UnreadResponse>, (StatusCode, String)> {
    let count = state
        .store
        .refresh_from(state.source.as_ref(), &UserId::new(id))
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    Ok(Json(UnreadResponse { count }))
}
