//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use chathub_core::config::realtime::RealtimeConfig;

use crate::bridge::SharedBroker;
use crate::connection::handle::ConnectionHandle;
use crate::hub::{self, HubCounts, HubHandle};
use crate::notify::Notifier;

/// Central real-time engine: hub control loop, idle-room sweep, and the
/// instance identity used to suppress broker self-echoes.
#[derive(Clone)]
pub struct RealtimeEngine {
    hub: HubHandle,
    config: RealtimeConfig,
    instance_id: Uuid,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("instance_id", &self.instance_id)
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new engine over the given broker and starts its tasks.
    pub fn new(config: RealtimeConfig, broker: SharedBroker) -> Self {
        let instance_id = Uuid::new_v4();
        let hub = hub::spawn_hub(config.clone(), broker, instance_id);
        let shutdown = CancellationToken::new();

        let sweep_hub = hub.clone();
        let sweep_token = shutdown.clone();
        let sweep_every = config.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_every);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = sweep_token.cancelled() => break,
                    _ = ticker.tick() => sweep_hub.sweep_idle().await,
                }
            }
        });

        info!(instance_id = %instance_id, "Real-time engine initialized");

        Self {
            hub,
            config,
            instance_id,
            shutdown,
        }
    }

    /// The hub handle.
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Creates a notification bridge bound to this engine's hub.
    pub fn notifier(&self) -> Notifier {
        Notifier::new(self.hub.clone())
    }

    /// The engine configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// This instance's origin marker.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Creates a connection handle with the configured queue bound and
    /// registers it with the hub. Returns the handle and the receiver the
    /// write pump drains.
    pub async fn register_connection(
        &self,
        identity: &str,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<Bytes>) {
        let (handle, rx) = ConnectionHandle::new(identity, self.config.outbound_queue_size);
        self.hub.register(handle.clone()).await;
        (handle, rx)
    }

    /// Current connection and room counts.
    pub async fn counts(&self) -> HubCounts {
        self.hub.counts().await
    }

    /// Initiates a graceful shutdown: stops the sweep, closes all rooms,
    /// and kills every connection.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");
        self.shutdown.cancel();
        self.hub.shutdown().await;
    }
}
