//! Event ingest endpoint where producers hand events to the server.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use pulse_core::{Audience, Event, EventId, EventKind, PulseError};

use crate::state::AppState;

/// Wire shape producers post to `/internal/events`. The producer may
/// supply its own event id for cross-process dedup; one is assigned
/// otherwise.
#[derive(Deserialize)]
pub struct IngestEvent {
    #[serde(default)]
    pub id: Option<EventId>,
    pub kind: EventKind,
    pub audience: Audience,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub event_id: EventId,
    pub targeted: usize,
    pub deduplicated: usize,
    pub channels: usize,
}

/// Accept an event from a producer and dispatch it.
///
/// Invalid events come back 422 and are applied to nobody; a store
/// failure comes back 503 so the producer can retry the whole event.
pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<IngestEvent>,
) -> Result<Json<IngestResponse>, (StatusCode, String)> {
    let event = Event {
        id: body.id.unwrap_or_default(),
        kind: body.kind,
        audience: body.audience,
        payload: body.payload,
        created_at: Utc::now(),
    };
    info!(event_id = %event.id, kind = %event.kind, "received event from producer");

    match state.dispatcher.dispatch(&event).await {
        Ok(report) => Ok(Json(IngestResponse {
            event_id: event.id,
            targeted: report.targeted,
            deduplicated: report.deduplicated,
            channels: report.delivered_channels,
        })),
        Err(e @ PulseError::InvalidEvent(_)) => {
            Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
        Err(e @ PulseError::Store(_)) => Err((StatusCode::SERVICE_UNAVAILABLE, e.to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
