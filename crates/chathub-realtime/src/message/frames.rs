//! Inbound and outbound wire frame definitions.
//!
//! The `action` discriminant fully determines how the rest of a frame is
//! interpreted. Decoding happens once at the connection boundary; unknown
//! actions surface as an explicit error value so callers can log them while
//! keeping the connection alive.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Control frames sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Join a room.
    Join {
        /// Room identifier.
        room: String,
        /// Opaque payload, unused by the core.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<serde_json::Value>,
    },
    /// Leave a room.
    Leave {
        /// Room identifier.
        room: String,
        /// Opaque payload, unused by the core.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<serde_json::Value>,
    },
}

/// Data frames fanned out to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A new chat message.
    NewMessage {
        /// Application message payload.
        data: serde_json::Value,
    },
}

impl ServerFrame {
    /// Serializes the frame to its wire bytes.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

/// Failure to decode an inbound control frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame parsed as JSON but carried an unrecognized action tag.
    #[error("unknown action `{action}`")]
    UnknownAction {
        /// The offending action tag.
        action: String,
    },
    /// The frame was not a valid control frame.
    #[error("malformed control frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decodes a client control frame, classifying unrecognized action tags
/// separately from unparseable input.
pub fn decode_client_frame(text: &str) -> Result<ClientFrame, FrameError> {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => Ok(frame),
        Err(err) => {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
                if let Some(action) = value.get("action").and_then(serde_json::Value::as_str) {
                    if action != "join" && action != "leave" {
                        return Err(FrameError::UnknownAction {
                            action: action.to_string(),
                        });
                    }
                }
            }
            Err(FrameError::Malformed(err))
        }
    }
}
