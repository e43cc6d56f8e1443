//! Redis pub/sub broker for multi-instance deployments.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use tokio::sync::mpsc;
use tracing::{info, warn};

use chathub_core::{AppError, AppResult};

use super::{Broker, Subscription};

/// Redis-backed broker relaying room traffic between server instances.
///
/// Publishes go through a shared multiplexed connection; each subscription
/// owns a dedicated pub/sub connection driven by a forwarder task.
#[derive(Clone)]
pub struct RedisBroker {
    /// Client used to open subscription connections.
    client: redis::Client,
    /// Shared publish connection.
    publisher: ConnectionManager,
    /// Per-subscription buffer size.
    buffer_size: usize,
}

impl std::fmt::Debug for RedisBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBroker").finish()
    }
}

impl RedisBroker {
    /// Connects to Redis and prepares the shared publish connection.
    pub async fn connect(url: &str, buffer_size: usize) -> AppResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::broker(format!("Invalid Redis URL: {e}")))?;

        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| AppError::broker(format!("Redis connection failed: {e}")))?;

        info!("Connected to Redis broker");

        Ok(Self {
            client,
            publisher,
            buffer_size,
        })
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn publish(&self, topic: &str, payload: Bytes) -> AppResult<()> {
        let mut conn = self.publisher.clone();
        redis::cmd("PUBLISH")
            .arg(topic)
            .arg(payload.as_ref())
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| AppError::broker(format!("Redis PUBLISH failed: {e}")))?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> AppResult<Subscription> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| AppError::broker(format!("Redis subscribe connection failed: {e}")))?;

        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| AppError::broker(format!("Redis SUBSCRIBE failed: {e}")))?;

        let (tx, rx) = mpsc::channel(self.buffer_size);
        let topic = topic.to_string();

        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: Vec<u8> = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(topic = %topic, error = %e, "Unreadable broker payload");
                        continue;
                    }
                };
                if tx.send(Bytes::from(payload)).await.is_err() {
                    break;
                }
            }
            tracing::debug!(topic = %topic, "Redis subscription ended");
        });

        Ok(Subscription::new(rx))
    }
}
