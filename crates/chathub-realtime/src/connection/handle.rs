//! Individual connection handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Result of a non-blocking enqueue onto a connection's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The payload was queued.
    Queued,
    /// The queue was full. The connection has been killed; a slow consumer
    /// must not stall the fan-out path for other members.
    Overflow,
    /// The connection is already closed.
    Closed,
}

/// A handle to a single live connection.
///
/// Holds the bounded sender for the outbound queue plus the identity of the
/// connected caller. The hub and rooms hold clones of the `Arc`; the queue
/// closes once every clone is dropped and the write pump drains out.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Caller identity this connection authenticated as.
    pub identity: String,
    /// Sender side of the outbound queue.
    sender: mpsc::Sender<Bytes>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
    /// Cancellation for both pumps.
    cancel: CancellationToken,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    /// Creates a handle and the receiver side of its outbound queue.
    pub fn new(identity: impl Into<String>, queue_size: usize) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(queue_size);
        let handle = Arc::new(Self {
            id: Uuid::new_v4(),
            identity: identity.into(),
            sender: tx,
            alive: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            connected_at: Utc::now(),
        });
        (handle, rx)
    }

    /// Enqueues a payload without blocking.
    ///
    /// Overflow kills the connection: the write pump is cancelled and the
    /// caller is expected to trigger a hub disconnect for this member.
    pub fn enqueue(&self, payload: Bytes) -> SendOutcome {
        if !self.is_alive() {
            return SendOutcome::Closed;
        }
        match self.sender.try_send(payload) {
            Ok(()) => SendOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    identity = %self.identity,
                    "Outbound queue full, killing slow connection"
                );
                self.kill();
                SendOutcome::Overflow
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                SendOutcome::Closed
            }
        }
    }

    /// Whether the connection is still alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Marks the connection as dead without cancelling its pumps.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Marks the connection dead and cancels both pumps.
    pub fn kill(&self) {
        self.mark_dead();
        self.cancel.cancel();
    }

    /// Resolves when the connection has been killed.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_fifo() {
        let (handle, mut rx) = ConnectionHandle::new("alice", 4);
        assert_eq!(handle.enqueue(Bytes::from_static(b"1")), SendOutcome::Queued);
        assert_eq!(handle.enqueue(Bytes::from_static(b"2")), SendOutcome::Queued);
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"1"));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"2"));
    }

    #[tokio::test]
    async fn test_overflow_kills_connection() {
        let (handle, _rx) = ConnectionHandle::new("alice", 1);
        assert_eq!(handle.enqueue(Bytes::from_static(b"1")), SendOutcome::Queued);
        assert_eq!(
            handle.enqueue(Bytes::from_static(b"2")),
            SendOutcome::Overflow
        );
        assert!(!handle.is_alive());
        // Further sends observe the dead connection.
        assert_eq!(handle.enqueue(Bytes::from_static(b"3")), SendOutcome::Closed);
        handle.cancelled().await;
    }

    #[tokio::test]
    async fn test_enqueue_after_receiver_dropped() {
        let (handle, rx) = ConnectionHandle::new("alice", 4);
        drop(rx);
        assert_eq!(handle.enqueue(Bytes::from_static(b"1")), SendOutcome::Closed);
        assert!(!handle.is_alive());
    }
}
