//! Notification bridge for non-connection producers.
//!
//! Lets code that holds no connection (for example the chat-send HTTP
//! handler, after it has persisted a message) inject that message into a
//! room's fan-out.

use tracing::error;

use crate::hub::HubHandle;
use crate::message::ServerFrame;

/// Fire-and-forget entry point into a room's fan-out.
#[derive(Debug, Clone)]
pub struct Notifier {
    hub: HubHandle,
}

impl Notifier {
    /// Creates a notifier bound to a hub.
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }

    /// Wraps `message` in the `new_message` fan-out frame and publishes it
    /// into the room, creating the room if absent. Serialization failures
    /// are logged and swallowed.
    pub async fn emit(&self, room_id: &str, message: serde_json::Value) {
        let frame = ServerFrame::NewMessage { data: message };
        match frame.to_bytes() {
            Ok(bytes) => self.hub.notify(room_id, bytes).await,
            Err(e) => error!(room = %room_id, error = %e, "Failed to serialize fan-out frame"),
        }
    }
}
