//! Pub/sub broker bridge for cross-instance relay.
//!
//! One broker topic per room identifier. Every room holds its own
//! subscription; publishes are shared across all rooms and the
//! notification bridge.

pub mod envelope;
pub mod memory;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use chathub_core::AppResult;

pub use envelope::RelayEnvelope;
pub use memory::MemoryBroker;
pub use redis::RedisBroker;

/// The backing pub/sub system relaying room traffic between instances.
///
/// Each publish is an independent, fire-and-forget operation with no
/// ordering guarantee relative to other publishes.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Publishes a payload to a topic.
    async fn publish(&self, topic: &str, payload: Bytes) -> AppResult<()>;

    /// Subscribes to a topic, returning a stream of payloads.
    async fn subscribe(&self, topic: &str) -> AppResult<Subscription>;
}

/// Shared broker handle.
pub type SharedBroker = Arc<dyn Broker>;

/// A single topic subscription.
///
/// The stream ends when the broker connection is lost or the subscription
/// is dropped on the broker side.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Bytes>,
}

impl Subscription {
    /// Wraps a delivery channel as a subscription.
    pub fn new(rx: mpsc::Receiver<Bytes>) -> Self {
        Self { rx }
    }

    /// Receives the next payload. Returns `None` when the subscription has
    /// ended.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}
