//! # chathub-realtime
//!
//! Real-time WebSocket engine for ChatHub. Provides:
//!
//! - Connection lifecycle with bounded outbound queues and liveness probes
//! - Room membership and local fan-out
//! - Cross-instance relay via a pub/sub broker (Redis in production)
//! - A hub actor serializing all registry mutation through one control loop
//! - A notification bridge for non-connection producers
//!
//! Membership maps are only ever mutated by their owning control loop;
//! everything coordinates over bounded mpsc channels rather than locks.

pub mod bridge;
pub mod connection;
pub mod engine;
pub mod hub;
pub mod message;
pub mod notify;
pub mod room;

pub use bridge::{Broker, MemoryBroker, RedisBroker, SharedBroker, Subscription};
pub use connection::handle::{ConnectionHandle, ConnectionId};
pub use engine::RealtimeEngine;
pub use hub::{HubCounts, HubHandle};
pub use notify::Notifier;
