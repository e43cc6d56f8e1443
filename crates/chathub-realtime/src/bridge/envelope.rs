//! Broker wire envelope.
//!
//! Relayed frames carry the originating instance's id so a room's
//! subscriber loop can drop the echo of its own publishes; local members
//! already received those through the direct fan-out path.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chathub_core::AppResult;

/// Envelope wrapping a fan-out frame for broker transit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEnvelope {
    /// Instance that published the frame.
    pub origin: Uuid,
    /// The fan-out frame as sent to clients.
    pub frame: serde_json::Value,
}

impl RelayEnvelope {
    /// Wraps fan-out frame bytes for broker transit.
    pub fn encode(origin: Uuid, frame_bytes: &[u8]) -> AppResult<Bytes> {
        let frame: serde_json::Value = serde_json::from_slice(frame_bytes)?;
        let envelope = Self { origin, frame };
        Ok(Bytes::from(serde_json::to_vec(&envelope)?))
    }

    /// Unwraps a broker payload into its origin and fan-out frame bytes.
    pub fn decode(payload: &[u8]) -> AppResult<(Uuid, Bytes)> {
        let envelope: Self = serde_json::from_slice(payload)?;
        let frame_bytes = Bytes::from(serde_json::to_vec(&envelope.frame)?);
        Ok((envelope.origin, frame_bytes))
    }
}
