//! Per-connection read and write pumps.
//!
//! Each accepted socket runs exactly two tasks: the read pump (inbound
//! control frames, liveness deadline) and the write pump (outbound queue
//! drain, liveness probes). Read-pump exit is the sole terminal transition:
//! it kills the handle, purges the hub, and joins the write pump.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chathub_core::config::realtime::RealtimeConfig;
use chathub_core::traits::Caller;

use crate::engine::RealtimeEngine;
use crate::hub::HubHandle;
use crate::message::{ClientFrame, FrameError, decode_client_frame};

use super::handle::ConnectionHandle;

/// Runs a freshly upgraded socket to completion: register, pump, tear down.
pub async fn serve_socket(engine: Arc<RealtimeEngine>, socket: WebSocket, caller: Caller) {
    let config = engine.config().clone();
    let (ws_tx, ws_rx) = socket.split();
    let (handle, outbound_rx) = engine.register_connection(&caller.id).await;

    info!(
        conn_id = %handle.id,
        identity = %caller.id,
        "WebSocket connection established"
    );

    let writer = tokio::spawn(write_pump(
        ws_tx,
        outbound_rx,
        handle.clone(),
        config.clone(),
    ));

    read_pump(ws_rx, handle.clone(), engine.hub().clone(), config).await;

    handle.kill();
    engine.hub().disconnect(handle.id).await;
    let _ = writer.await;

    info!(
        conn_id = %handle.id,
        identity = %caller.id,
        "WebSocket connection closed"
    );
}

/// Reads frames until the stream errors, closes, or goes silent past the
/// liveness deadline. Any inbound frame (pongs included) extends liveness.
async fn read_pump(
    mut ws_rx: SplitStream<WebSocket>,
    handle: Arc<ConnectionHandle>,
    hub: HubHandle,
    config: RealtimeConfig,
) {
    let mut joined: HashSet<String> = HashSet::new();

    loop {
        let frame = tokio::select! {
            _ = handle.cancelled() => break,
            next = tokio::time::timeout(config.pong_timeout(), ws_rx.next()) => match next {
                Err(_) => {
                    warn!(conn_id = %handle.id, "Liveness deadline exceeded");
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    debug!(conn_id = %handle.id, error = %e, "Socket read failed");
                    break;
                }
                Ok(Some(Ok(frame))) => frame,
            },
        };

        match frame {
            Message::Text(text) => dispatch_control(&text, &handle, &hub, &mut joined).await,
            Message::Close(_) => break,
            // Protocol pings are answered by axum; pongs and binary frames
            // count only as liveness.
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }
}

/// Decodes one control frame and applies the join/leave action.
async fn dispatch_control(
    text: &str,
    handle: &Arc<ConnectionHandle>,
    hub: &HubHandle,
    joined: &mut HashSet<String>,
) {
    match decode_client_frame(text) {
        Ok(ClientFrame::Join { room, .. }) => {
            if joined.insert(room.clone()) {
                hub.join(handle.clone(), room).await;
            }
        }
        Ok(ClientFrame::Leave { room, .. }) => {
            if joined.remove(&room) {
                hub.leave(handle.id, room).await;
            }
        }
        Err(FrameError::UnknownAction { action }) => {
            warn!(conn_id = %handle.id, action = %action, "Ignoring unknown action");
        }
        Err(FrameError::Malformed(e)) => {
            debug!(conn_id = %handle.id, error = %e, "Ignoring malformed control frame");
        }
    }
}

/// Drains the outbound queue onto the socket and sends periodic liveness
/// probes. Queue closure sends a close frame; any write failure kills the
/// connection.
async fn write_pump(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Bytes>,
    handle: Arc<ConnectionHandle>,
    config: RealtimeConfig,
) {
    let first_ping = tokio::time::Instant::now() + config.ping_interval();
    let mut pings = tokio::time::interval_at(first_ping, config.ping_interval());

    loop {
        tokio::select! {
            _ = handle.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
            maybe = outbound_rx.recv() => match maybe {
                Some(first) => {
                    let text = coalesce(first, &mut outbound_rx);
                    if !write_with_deadline(
                        &mut ws_tx,
                        Message::Text(text.into()),
                        config.write_timeout(),
                    )
                    .await
                    {
                        handle.kill();
                        break;
                    }
                }
                None => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            },
            _ = pings.tick() => {
                if !write_with_deadline(
                    &mut ws_tx,
                    Message::Ping(Bytes::new()),
                    config.write_timeout(),
                )
                .await
                {
                    handle.kill();
                    break;
                }
            }
        }
    }
}

/// Folds any already-queued payloads into one newline-separated write to
/// cut per-frame syscalls under load.
fn coalesce(first: Bytes, rx: &mut mpsc::Receiver<Bytes>) -> String {
    let mut buf = first.to_vec();
    while let Ok(next) = rx.try_recv() {
        buf.push(b'\n');
        buf.extend_from_slice(&next);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn write_with_deadline(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    msg: Message,
    deadline: Duration,
) -> bool {
    match tokio::time::timeout(deadline, ws_tx.send(msg)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!(error = %e, "Socket write failed");
            false
        }
        Err(_) => {
            debug!("Socket write deadline exceeded");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_coalesce_drains_queued_payloads() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.try_send(Bytes::from_static(b"{\"b\":2}")).unwrap();
        tx.try_send(Bytes::from_static(b"{\"c\":3}")).unwrap();
        let text = coalesce(Bytes::from_static(b"{\"a\":1}"), &mut rx);
        assert_eq!(text, "{\"a\":1}\n{\"b\":2}\n{\"c\":3}");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_coalesce_single_payload() {
        let (_tx, mut rx) = mpsc::channel::<Bytes>(8);
        let text = coalesce(Bytes::from_static(b"{\"a\":1}"), &mut rx);
        assert_eq!(text, "{\"a\":1}");
    }
}
