//! Room — a named fan-out group bridged to the broker.
//!
//! Each room runs two tasks: a control loop that exclusively owns the
//! member map, and a subscriber loop consuming the room's broker topic so
//! publishes from other instances reach local members. A publish fans out
//! locally first (fast path) and relays through the broker for everyone
//! else; the subscriber loop drops the echo of this instance's own
//! publishes.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::bridge::{RelayEnvelope, SharedBroker};
use crate::connection::handle::{ConnectionHandle, ConnectionId, SendOutcome};
use crate::hub::HubCommand;

/// Commands processed by a room's control loop.
#[derive(Debug)]
pub enum RoomCommand {
    /// Add a member. Idempotent by connection id.
    AddMember(Arc<ConnectionHandle>),
    /// Remove a member. No-op if absent.
    RemoveMember(ConnectionId),
    /// Fan out locally and relay through the broker.
    Publish(Bytes),
    /// Fan out locally only (broker-relayed traffic).
    Deliver(Bytes),
    /// Stop the subscriber loop and exit.
    Close,
}

/// Cloneable handle for sending commands to a room's control loop.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: String,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The room identifier (and broker topic).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Adds a member connection.
    pub async fn add_member(&self, handle: Arc<ConnectionHandle>) {
        let _ = self.tx.send(RoomCommand::AddMember(handle)).await;
    }

    /// Removes a member connection.
    pub async fn remove_member(&self, conn_id: ConnectionId) {
        let _ = self.tx.send(RoomCommand::RemoveMember(conn_id)).await;
    }

    /// Publishes a fan-out frame to all members, local and cross-instance.
    pub async fn publish(&self, payload: Bytes) {
        let _ = self.tx.send(RoomCommand::Publish(payload)).await;
    }

    /// Closes the room.
    pub async fn close(&self) {
        let _ = self.tx.send(RoomCommand::Close).await;
    }
}

/// Spawns a room's control loop and broker subscriber loop.
pub(crate) fn spawn_room(
    room_id: String,
    origin: Uuid,
    broker: SharedBroker,
    hub_tx: mpsc::Sender<HubCommand>,
    queue_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(queue_size);

    let subscriber = tokio::spawn(subscriber_loop(
        room_id.clone(),
        origin,
        broker.clone(),
        tx.clone(),
    ));
    tokio::spawn(run_room(
        room_id.clone(),
        origin,
        broker,
        hub_tx,
        rx,
        subscriber,
    ));

    RoomHandle { id: room_id, tx }
}

async fn run_room(
    room_id: String,
    origin: Uuid,
    broker: SharedBroker,
    hub_tx: mpsc::Sender<HubCommand>,
    mut rx: mpsc::Receiver<RoomCommand>,
    subscriber: JoinHandle<()>,
) {
    let mut members: HashMap<ConnectionId, Arc<ConnectionHandle>> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RoomCommand::AddMember(handle) => {
                trace!(room = %room_id, conn_id = %handle.id, "Member added");
                members.insert(handle.id, handle);
            }
            RoomCommand::RemoveMember(conn_id) => {
                members.remove(&conn_id);
            }
            RoomCommand::Publish(payload) => {
                fan_out(&room_id, &mut members, &payload, &hub_tx);
                relay(&room_id, origin, &broker, &payload);
            }
            RoomCommand::Deliver(payload) => {
                fan_out(&room_id, &mut members, &payload, &hub_tx);
            }
            RoomCommand::Close => break,
        }
    }

    subscriber.abort();
    debug!(room = %room_id, "Room closed");
}

/// Enqueues a payload onto every member's outbound queue without blocking.
///
/// Members whose queue overflows are killed and reported to the hub for
/// full teardown; members already closed are pruned locally. Either way,
/// delivery to the remaining members continues.
fn fan_out(
    room_id: &str,
    members: &mut HashMap<ConnectionId, Arc<ConnectionHandle>>,
    payload: &Bytes,
    hub_tx: &mpsc::Sender<HubCommand>,
) {
    let mut dead: Vec<(ConnectionId, bool)> = Vec::new();
    for (conn_id, handle) in members.iter() {
        match handle.enqueue(payload.clone()) {
            SendOutcome::Queued => {}
            SendOutcome::Overflow => {
                warn!(room = %room_id, conn_id = %conn_id, "Member dropped on overflow");
                dead.push((*conn_id, true));
            }
            SendOutcome::Closed => dead.push((*conn_id, false)),
        }
    }
    for (conn_id, notify_hub) in dead {
        members.remove(&conn_id);
        if notify_hub
            && hub_tx
                .try_send(HubCommand::Disconnect { conn_id })
                .is_err()
        {
            // The pump teardown will disconnect it once the kill lands.
            warn!(conn_id = %conn_id, "Hub queue full, disconnect deferred");
        }
    }
}

/// Relays a published frame to other instances through the broker.
/// Spawned so broker latency never stalls the control loop.
fn relay(room_id: &str, origin: Uuid, broker: &SharedBroker, payload: &Bytes) {
    match RelayEnvelope::encode(origin, payload) {
        Ok(bytes) => {
            let broker = broker.clone();
            let topic = room_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = broker.publish(&topic, bytes).await {
                    warn!(topic = %topic, error = %e, "Broker publish failed");
                }
            });
        }
        Err(e) => error!(room = %room_id, error = %e, "Failed to encode relay envelope"),
    }
}

/// Consumes the room's broker topic and forwards cross-instance frames to
/// the control loop. Runs for the lifetime of the room.
async fn subscriber_loop(
    room_id: String,
    origin: Uuid,
    broker: SharedBroker,
    room_tx: mpsc::Sender<RoomCommand>,
) {
    let mut sub = match broker.subscribe(&room_id).await {
        Ok(sub) => sub,
        Err(e) => {
            error!(
                room = %room_id,
                error = %e,
                "Broker subscribe failed, cross-instance delivery disabled for this room"
            );
            return;
        }
    };

    while let Some(payload) = sub.recv().await {
        match RelayEnvelope::decode(&payload) {
            Ok((from, _)) if from == origin => {
                trace!(room = %room_id, "Skipping self-echo");
            }
            Ok((_, frame)) => {
                if room_tx.send(RoomCommand::Deliver(frame)).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(room = %room_id, error = %e, "Undecodable relay payload"),
        }
    }

    debug!(room = %room_id, "Broker subscription ended");
}
