//! Traits for external collaborators.
//!
//! Persistence and authentication live outside this system; these traits
//! are the only surface ChatHub depends on. Production wiring supplies the
//! real implementations, tests supply in-memory ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::AppResult;

/// Caller identity produced by the token verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    /// Stable caller identifier.
    pub id: String,
    /// Display name for message authorship.
    pub display_name: String,
}

/// Verifies bearer credentials and produces a caller identity.
///
/// Authentication policy (issuance, expiry, revocation) is entirely the
/// implementor's concern.
#[async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    /// Verify a bearer credential. Returns the caller identity or an
    /// authentication error.
    async fn verify(&self, token: &str) -> AppResult<Caller>;
}

/// A chat message as persisted by the message store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Message identifier.
    pub id: Uuid,
    /// Room the message belongs to.
    pub room_id: String,
    /// Sender's caller identifier.
    pub sender_id: String,
    /// Sender's display name at send time.
    pub sender_name: String,
    /// Opaque message body.
    pub body: serde_json::Value,
    /// Persistence timestamp.
    pub created_at: DateTime<Utc>,
}

/// Repository for persisted chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Persist a new message and return the stored record.
    async fn create(
        &self,
        room_id: &str,
        sender: &Caller,
        body: serde_json::Value,
    ) -> AppResult<StoredMessage>;

    /// Fetch the most recent messages for a room, newest first.
    async fn find_recent(&self, room_id: &str, limit: u32) -> AppResult<Vec<StoredMessage>>;
}
