//! WebSocket upgrade handler.

use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;

use chathub_realtime::connection::serve_socket;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameter for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Bearer credential.
    pub token: String,
}

/// GET /ws?token={credential} — WebSocket upgrade.
///
/// The credential is verified before the upgrade; the upgraded socket is
/// then handed to the realtime engine, which owns the connection for the
/// rest of its life.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let caller = state.verifier.verify(&query.token).await?;

    let engine = state.engine.clone();
    let max_frame = state.config.realtime.max_frame_bytes;

    Ok(ws
        .max_message_size(max_frame)
        .on_upgrade(move |socket| serve_socket(engine, socket, caller)))
}
