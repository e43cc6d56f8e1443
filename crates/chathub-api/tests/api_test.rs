//! Integration tests for the HTTP API layer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use chathub_core::config::AppConfig;
use chathub_core::traits::{Caller, MessageStore, StoredMessage, TokenVerifier};
use chathub_core::{AppError, AppResult};
use chathub_realtime::{MemoryBroker, RealtimeEngine};

/// Accepts any non-empty token except `"bad"` as the caller id.
struct StubVerifier;

#[async_trait]
impl TokenVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> AppResult<Caller> {
        if token.is_empty() || token == "bad" {
            return Err(AppError::authentication("invalid token"));
        }
        Ok(Caller {
            id: token.to_string(),
            display_name: token.to_string(),
        })
    }
}

/// In-memory message repository.
#[derive(Default)]
struct StubStore {
    messages: Mutex<Vec<StoredMessage>>,
}

#[async_trait]
impl MessageStore for StubStore {
    async fn create(
        &self,
        room_id: &str,
        sender: &Caller,
        body: Value,
    ) -> AppResult<StoredMessage> {
        let stored = StoredMessage {
            id: Uuid::new_v4(),
            room_id: room_id.to_string(),
            sender_id: sender.id.clone(),
            sender_name: sender.display_name.clone(),
            body,
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn find_recent(&self, room_id: &str, limit: u32) -> AppResult<Vec<StoredMessage>> {
        let mut found: Vec<StoredMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        found.reverse();
        found.truncate(limit as usize);
        Ok(found)
    }
}

fn test_app() -> (Router, Arc<RealtimeEngine>) {
    let config = Arc::new(AppConfig::default());
    let engine = Arc::new(RealtimeEngine::new(
        config.realtime.clone(),
        Arc::new(MemoryBroker::new(64)),
    ));
    let state = chathub_api::AppState::new(
        config,
        engine.clone(),
        Arc::new(StubVerifier),
        Arc::new(StubStore::default()),
    );
    (chathub_api::build_router(state), engine)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _engine) = test_app();

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 0);
}

#[tokio::test]
async fn test_ws_upgrade_without_token_is_rejected() {
    let (app, _engine) = test_app();

    let response = app
        .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(
        response.status().is_client_error(),
        "expected a client error, got {}",
        response.status()
    );
}

#[tokio::test]
async fn test_send_message_requires_valid_token() {
    let (app, _engine) = test_app();

    let response = app
        .oneshot(
            Request::post("/api/rooms/general/messages")
                .header("content-type", "application/json")
                .header("authorization", "Bearer bad")
                .body(Body::from(json!({"body": {"text": "hi"}}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_send_message_stores_and_fans_out() {
    let (app, engine) = test_app();

    // A connected member of the room should see the fan-out frame.
    let (handle, mut rx) = engine.register_connection("bob").await;
    engine.hub().join(handle, "general").await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/rooms/general/messages")
                .header("content-type", "application/json")
                .header("authorization", "Bearer alice")
                .body(Body::from(json!({"body": {"text": "hi"}}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let stored = body_json(response).await;
    assert_eq!(stored["room_id"], "general");
    assert_eq!(stored["sender_id"], "alice");
    assert_eq!(stored["body"], json!({"text": "hi"}));

    let payload = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no fan-out delivery")
        .unwrap();
    let frame: Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(frame["action"], "new_message");
    assert_eq!(frame["data"]["body"], json!({"text": "hi"}));

    // History reflects the stored message, newest first.
    let history = app
        .oneshot(
            Request::get("/api/rooms/general/messages")
                .header("authorization", "Bearer alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(history.status(), StatusCode::OK);
    let items = body_json(history).await;
    assert_eq!(items.as_array().unwrap().len(), 1);
}
