//! In-process broker for single-node deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tokio::sync::mpsc;

use chathub_core::AppResult;

use super::{Broker, Subscription};

/// In-process pub/sub implementation.
///
/// Delivery is best-effort: a subscriber whose buffer is full misses that
/// payload, and closed subscribers are pruned on the next publish.
#[derive(Debug)]
pub struct MemoryBroker {
    /// Topic → subscriber senders.
    topics: RwLock<HashMap<String, Vec<mpsc::Sender<Bytes>>>>,
    /// Per-subscription buffer size.
    buffer_size: usize,
}

impl MemoryBroker {
    /// Creates a new in-process broker.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            buffer_size,
        }
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, topic: &str, payload: Bytes) -> AppResult<()> {
        let mut topics = self.topics.write().await;
        let drained = if let Some(senders) = topics.get_mut(topic) {
            senders.retain(|tx| match tx.try_send(payload.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(topic, "Subscriber buffer full, payload dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
            senders.is_empty()
        } else {
            false
        };
        if drained {
            topics.remove(topic);
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> AppResult<Subscription> {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        self.topics
            .write()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(Subscription::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let broker = MemoryBroker::new(16);
        let mut sub = broker.subscribe("r1").await.unwrap();
        broker.publish("r1", Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(sub.recv().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let broker = MemoryBroker::new(16);
        broker.publish("empty", Bytes::from_static(b"x")).await.unwrap();
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let broker = MemoryBroker::new(16);
        let mut sub_a = broker.subscribe("a").await.unwrap();
        let mut sub_b = broker.subscribe("b").await.unwrap();
        broker.publish("a", Bytes::from_static(b"for-a")).await.unwrap();
        assert_eq!(sub_a.recv().await.unwrap(), Bytes::from_static(b"for-a"));
        let other = tokio::time::timeout(std::time::Duration::from_millis(50), sub_b.recv()).await;
        assert!(other.is_err());
    }
}
