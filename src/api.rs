//! HTTP API endpoints
//!
//! Read-only endpoints the play page uses to check a game PIN before opening
//! a socket.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;
use crate::types::RoomId;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub rooms: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/rooms/{room_id}", get(get_room))
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rooms: state.registry.len().await,
    })
}

/// GET /api/rooms/{room_id}
///
/// Snapshot of a running room, 404 if no such room is live.
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<u32>,
) -> Response {
    let room_id = RoomId(room_id);
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Room {} not found", room_id),
            }),
        )
            .into_response()
    };

    let Some(session) = state.registry.lookup(room_id).await else {
        return not_found();
    };

    match session.snapshot().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            tracing::debug!("Snapshot of room {} failed: {}", room_id, e);
            not_found()
        }
    }
}
