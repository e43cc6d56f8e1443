//! Development stand-ins for the external collaborators.
//!
//! Production deployments replace these with the real identity provider
//! and message repository behind the same traits.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use chathub_core::traits::{Caller, MessageStore, StoredMessage, TokenVerifier};
use chathub_core::{AppError, AppResult};

/// Accepts any non-empty bearer token and uses it as the caller identity.
///
/// For local development only; carries no authentication policy at all.
#[derive(Debug)]
pub struct DevTokenVerifier;

#[async_trait]
impl TokenVerifier for DevTokenVerifier {
    async fn verify(&self, token: &str) -> AppResult<Caller> {
        if token.is_empty() {
            return Err(AppError::authentication("empty bearer token"));
        }
        Ok(Caller {
            id: token.to_string(),
            display_name: token.to_string(),
        })
    }
}

/// Keeps messages in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<StoredMessage>>,
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(
        &self,
        room_id: &str,
        sender: &Caller,
        body: serde_json::Value,
    ) -> AppResult<StoredMessage> {
        let stored = StoredMessage {
            id: Uuid::new_v4(),
            room_id: room_id.to_string(),
            sender_id: sender.id.clone(),
            sender_name: sender.display_name.clone(),
            body,
            created_at: Utc::now(),
        };
        self.messages
            .lock()
            .map_err(|_| AppError::internal("message store poisoned"))?
            .push(stored.clone());
        Ok(stored)
    }

    async fn find_recent(&self, room_id: &str, limit: u32) -> AppResult<Vec<StoredMessage>> {
        let mut found: Vec<StoredMessage> = self
            .messages
            .lock()
            .map_err(|_| AppError::internal("message store poisoned"))?
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        found.reverse();
        found.truncate(limit as usize);
        Ok(found)
    }
}
