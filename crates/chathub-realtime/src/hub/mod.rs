//! Hub — the per-process registry of connections and rooms.
//!
//! All registry state is owned by a single control loop; registration,
//! membership changes, broadcasts, and room eviction arrive as commands on
//! one channel and are processed one at a time. Nothing else ever touches
//! the maps.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use uuid::Uuid;

use chathub_core::config::realtime::RealtimeConfig;

use crate::bridge::SharedBroker;
use crate::connection::handle::{ConnectionHandle, ConnectionId, SendOutcome};
use crate::room::{self, RoomHandle};

/// Commands processed by the hub control loop.
#[derive(Debug)]
pub enum HubCommand {
    /// Register a new connection.
    Register(Arc<ConnectionHandle>),
    /// Tear down a connection: registry, all room memberships.
    Disconnect {
        /// Connection to remove.
        conn_id: ConnectionId,
    },
    /// Enqueue a payload onto every registered connection.
    Broadcast(Bytes),
    /// Add a connection to a room, creating the room if absent.
    Join {
        /// Joining connection.
        handle: Arc<ConnectionHandle>,
        /// Room identifier.
        room: String,
    },
    /// Remove a connection from a room. No-op if the room is absent.
    Leave {
        /// Leaving connection.
        conn_id: ConnectionId,
        /// Room identifier.
        room: String,
    },
    /// Publish a payload into a room, creating the room if absent.
    Notify {
        /// Room identifier.
        room: String,
        /// Fan-out frame bytes.
        payload: Bytes,
    },
    /// Evict rooms that have been empty beyond the grace window.
    SweepIdle,
    /// Report connection and room counts.
    Counts {
        /// Reply channel.
        reply: oneshot::Sender<HubCounts>,
    },
    /// Close all rooms and connections and stop the loop.
    Shutdown,
}

/// Snapshot of hub occupancy.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HubCounts {
    /// Active connections.
    pub connections: usize,
    /// Known rooms.
    pub rooms: usize,
}

/// Cloneable handle for sending commands to the hub control loop.
///
/// Rooms hold the raw sender as their back-reference; everything else goes
/// through these methods. Sends to a stopped hub are silently dropped.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Registers a connection.
    pub async fn register(&self, handle: Arc<ConnectionHandle>) {
        let _ = self.tx.send(HubCommand::Register(handle)).await;
    }

    /// Disconnects a connection everywhere. Idempotent.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        let _ = self.tx.send(HubCommand::Disconnect { conn_id }).await;
    }

    /// Broadcasts a payload to every registered connection.
    pub async fn broadcast(&self, payload: Bytes) {
        let _ = self.tx.send(HubCommand::Broadcast(payload)).await;
    }

    /// Joins a connection to a room.
    pub async fn join(&self, handle: Arc<ConnectionHandle>, room: impl Into<String>) {
        let _ = self
            .tx
            .send(HubCommand::Join {
                handle,
                room: room.into(),
            })
            .await;
    }

    /// Removes a connection from a room.
    pub async fn leave(&self, conn_id: ConnectionId, room: impl Into<String>) {
        let _ = self
            .tx
            .send(HubCommand::Leave {
                conn_id,
                room: room.into(),
            })
            .await;
    }

    /// Publishes a fan-out frame into a room.
    pub async fn notify(&self, room: impl Into<String>, payload: Bytes) {
        let _ = self
            .tx
            .send(HubCommand::Notify {
                room: room.into(),
                payload,
            })
            .await;
    }

    /// Runs one idle-room eviction pass.
    pub async fn sweep_idle(&self) {
        let _ = self.tx.send(HubCommand::SweepIdle).await;
    }

    /// Returns current connection and room counts.
    pub async fn counts(&self) -> HubCounts {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(HubCommand::Counts { reply }).await;
        rx.await.unwrap_or_default()
    }

    /// Stops the hub, closing all rooms and connections.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(HubCommand::Shutdown).await;
    }
}

/// Spawns the hub control loop and returns its handle.
pub(crate) fn spawn_hub(config: RealtimeConfig, broker: SharedBroker, origin: Uuid) -> HubHandle {
    let (tx, rx) = mpsc::channel(config.hub_queue_size);
    let handle = HubHandle { tx: tx.clone() };
    tokio::spawn(run_hub(rx, tx, config, broker, origin));
    handle
}

/// Per-room bookkeeping held by the hub.
struct RoomEntry {
    handle: RoomHandle,
    members: HashSet<ConnectionId>,
    /// Refreshed on join, leave, and publish; eviction measures from here.
    last_touched: Instant,
}

async fn run_hub(
    mut rx: mpsc::Receiver<HubCommand>,
    self_tx: mpsc::Sender<HubCommand>,
    config: RealtimeConfig,
    broker: SharedBroker,
    origin: Uuid,
) {
    let mut by_identity: HashMap<String, Arc<ConnectionHandle>> = HashMap::new();
    let mut by_id: HashMap<ConnectionId, Arc<ConnectionHandle>> = HashMap::new();
    let mut joined: HashMap<ConnectionId, HashSet<String>> = HashMap::new();
    let mut rooms: HashMap<String, RoomEntry> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            HubCommand::Register(handle) => {
                by_id.insert(handle.id, handle.clone());
                match by_identity.entry(handle.identity.clone()) {
                    Entry::Vacant(slot) => {
                        info!(
                            conn_id = %handle.id,
                            identity = %handle.identity,
                            "Connection registered"
                        );
                        slot.insert(handle);
                    }
                    Entry::Occupied(_) => {
                        debug!(
                            conn_id = %handle.id,
                            identity = %handle.identity,
                            "Identity already registered, keeping existing entry"
                        );
                    }
                }
            }
            HubCommand::Disconnect { conn_id } => {
                disconnect(
                    conn_id,
                    &mut by_identity,
                    &mut by_id,
                    &mut joined,
                    &mut rooms,
                )
                .await;
            }
            HubCommand::Broadcast(payload) => {
                let mut dead = Vec::new();
                for handle in by_identity.values() {
                    match handle.enqueue(payload.clone()) {
                        SendOutcome::Queued => {}
                        SendOutcome::Overflow | SendOutcome::Closed => dead.push(handle.id),
                    }
                }
                for conn_id in dead {
                    disconnect(
                        conn_id,
                        &mut by_identity,
                        &mut by_id,
                        &mut joined,
                        &mut rooms,
                    )
                    .await;
                }
            }
            HubCommand::Join { handle, room } => {
                let entry = find_or_create(&mut rooms, &room, &config, &broker, origin, &self_tx);
                entry.last_touched = Instant::now();
                if entry.members.insert(handle.id) {
                    debug!(conn_id = %handle.id, room = %room, "Joined room");
                    joined.entry(handle.id).or_default().insert(room.clone());
                    entry.handle.add_member(handle).await;
                }
            }
            HubCommand::Leave { conn_id, room } => {
                if let Some(entry) = rooms.get_mut(&room) {
                    if entry.members.remove(&conn_id) {
                        debug!(conn_id = %conn_id, room = %room, "Left room");
                        entry.handle.remove_member(conn_id).await;
                        entry.last_touched = Instant::now();
                    }
                }
                if let Some(set) = joined.get_mut(&conn_id) {
                    set.remove(&room);
                }
            }
            HubCommand::Notify { room, payload } => {
                let entry = find_or_create(&mut rooms, &room, &config, &broker, origin, &self_tx);
                entry.last_touched = Instant::now();
                entry.handle.publish(payload).await;
            }
            HubCommand::SweepIdle => {
                let grace = config.room_idle_grace();
                let expired: Vec<String> = rooms
                    .iter()
                    .filter(|(_, entry)| {
                        entry.members.is_empty() && entry.last_touched.elapsed() >= grace
                    })
                    .map(|(id, _)| id.clone())
                    .collect();
                for id in expired {
                    if let Some(entry) = rooms.remove(&id) {
                        entry.handle.close().await;
                        info!(room = %id, "Idle room evicted");
                    }
                }
            }
            HubCommand::Counts { reply } => {
                let _ = reply.send(HubCounts {
                    connections: by_id.len(),
                    rooms: rooms.len(),
                });
            }
            HubCommand::Shutdown => {
                for (_, entry) in rooms.drain() {
                    entry.handle.close().await;
                }
                for (_, handle) in by_id.drain() {
                    handle.kill();
                }
                by_identity.clear();
                joined.clear();
                info!("Hub stopped");
                break;
            }
        }
    }
}

/// Looks up a room, spawning it (with its broker subscription) if absent.
fn find_or_create<'a>(
    rooms: &'a mut HashMap<String, RoomEntry>,
    room_id: &str,
    config: &RealtimeConfig,
    broker: &SharedBroker,
    origin: Uuid,
    hub_tx: &mpsc::Sender<HubCommand>,
) -> &'a mut RoomEntry {
    rooms.entry(room_id.to_string()).or_insert_with(|| {
        info!(room = %room_id, "Room created");
        RoomEntry {
            handle: room::spawn_room(
                room_id.to_string(),
                origin,
                broker.clone(),
                hub_tx.clone(),
                config.room_queue_size,
            ),
            members: HashSet::new(),
            last_touched: Instant::now(),
        }
    })
}

/// Removes a connection from the registry and every joined room.
/// Safe to call for a connection that is already gone.
async fn disconnect(
    conn_id: ConnectionId,
    by_identity: &mut HashMap<String, Arc<ConnectionHandle>>,
    by_id: &mut HashMap<ConnectionId, Arc<ConnectionHandle>>,
    joined: &mut HashMap<ConnectionId, HashSet<String>>,
    rooms: &mut HashMap<String, RoomEntry>,
) {
    let Some(handle) = by_id.remove(&conn_id) else {
        return;
    };
    handle.kill();

    // Another connection may share the identity; only evict our own entry.
    if by_identity
        .get(&handle.identity)
        .is_some_and(|registered| registered.id == conn_id)
    {
        by_identity.remove(&handle.identity);
    }

    for room_id in joined.remove(&conn_id).unwrap_or_default() {
        if let Some(entry) = rooms.get_mut(&room_id) {
            entry.members.remove(&conn_id);
            entry.handle.remove_member(conn_id).await;
            if entry.members.is_empty() {
                entry.last_touched = Instant::now();
            }
        }
    }

    info!(
        conn_id = %conn_id,
        identity = %handle.identity,
        "Connection unregistered"
    );
}
