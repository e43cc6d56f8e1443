//! Health check handler.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Health response with engine occupancy.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is responsive.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Active WebSocket connections on this instance.
    pub connections: usize,
    /// Known rooms on this instance.
    pub rooms: usize,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let counts = state.engine.counts().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: counts.connections,
        rooms: counts.rooms,
    })
}
