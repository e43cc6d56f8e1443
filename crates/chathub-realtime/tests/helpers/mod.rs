//! Shared helpers for realtime engine integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use chathub_core::config::realtime::RealtimeConfig;
use chathub_realtime::{MemoryBroker, RealtimeEngine, SharedBroker};

/// Config tuned for tests: small queues, immediate room eviction
/// eligibility, no surprise sweeps.
pub fn test_config(outbound_queue_size: usize) -> RealtimeConfig {
    RealtimeConfig {
        outbound_queue_size,
        room_idle_grace_seconds: 0,
        sweep_interval_seconds: 3600,
        ..RealtimeConfig::default()
    }
}

/// Engine over a fresh in-process broker.
pub fn engine(outbound_queue_size: usize) -> Arc<RealtimeEngine> {
    let broker: SharedBroker = Arc::new(MemoryBroker::new(64));
    Arc::new(RealtimeEngine::new(test_config(outbound_queue_size), broker))
}

/// Two engines sharing one broker, as two server instances would.
pub fn engine_pair() -> (Arc<RealtimeEngine>, Arc<RealtimeEngine>) {
    let broker: SharedBroker = Arc::new(MemoryBroker::new(64));
    let a = Arc::new(RealtimeEngine::new(test_config(16), broker.clone()));
    let b = Arc::new(RealtimeEngine::new(test_config(16), broker));
    (a, b)
}

/// Receives one payload with a deadline, panicking on silence.
pub async fn recv_frame(rx: &mut mpsc::Receiver<Bytes>) -> serde_json::Value {
    let payload = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("outbound queue closed");
    serde_json::from_slice(&payload).expect("delivered payload is not JSON")
}

/// Asserts nothing arrives within a short window. A queue closed with
/// nothing buffered also counts as silence.
pub async fn assert_silent(rx: &mut mpsc::Receiver<Bytes>) {
    match tokio::time::timeout(Duration::from_millis(150), rx.recv()).await {
        Err(_) => {}
        Ok(None) => {}
        Ok(Some(payload)) => panic!("unexpected delivery: {payload:?}"),
    }
}

/// Lets in-flight hub/room commands settle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
