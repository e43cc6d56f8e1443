//! Chat message endpoints.
//!
//! The send path is the notification-bridge consumer: the message is
//! durably stored first, then injected into the room's fan-out.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use serde::Deserialize;

use chathub_core::traits::StoredMessage;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for sending a message.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Opaque application message payload.
    pub body: serde_json::Value,
}

/// POST /api/rooms/{room_id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<StoredMessage>), ApiError> {
    let caller = state.verifier.verify(auth.token()).await?;

    let stored = state
        .messages
        .create(&room_id, &caller, request.body)
        .await?;

    state
        .notifier
        .emit(&room_id, serde_json::to_value(&stored)?)
        .await;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Query parameters for message history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of messages to return.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// GET /api/rooms/{room_id}/messages
pub async fn recent_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<StoredMessage>>, ApiError> {
    state.verifier.verify(auth.token()).await?;
    let messages = state.messages.find_recent(&room_id, query.limit).await?;
    Ok(Json(messages))
}
