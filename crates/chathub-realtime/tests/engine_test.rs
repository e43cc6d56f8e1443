//! Integration tests for hub, rooms, and fan-out on a single instance.

mod helpers;

use bytes::Bytes;
use serde_json::json;

#[tokio::test]
async fn test_notify_round_trip() {
    let engine = helpers::engine(16);
    let (handle, mut rx) = engine.register_connection("alice").await;
    engine.hub().join(handle.clone(), "general").await;

    engine.notifier().emit("general", json!({"text": "hi"})).await;

    let frame = helpers::recv_frame(&mut rx).await;
    assert_eq!(frame, json!({"action": "new_message", "data": {"text": "hi"}}));
}

#[tokio::test]
async fn test_fan_out_reaches_all_members() {
    let engine = helpers::engine(16);
    let mut receivers = Vec::new();
    for i in 0..5 {
        let (handle, rx) = engine.register_connection(&format!("user-{i}")).await;
        engine.hub().join(handle, "general").await;
        receivers.push(rx);
    }

    engine.notifier().emit("general", json!("payload")).await;

    for rx in &mut receivers {
        let frame = helpers::recv_frame(rx).await;
        assert_eq!(frame["data"], json!("payload"));
    }
}

#[tokio::test]
async fn test_membership_tracks_joins_minus_leaves() {
    let engine = helpers::engine(16);
    let (handle, mut rx) = engine.register_connection("alice").await;

    engine.hub().join(handle.clone(), "a").await;
    engine.hub().join(handle.clone(), "b").await;
    engine.hub().leave(handle.id, "a").await;

    engine.notifier().emit("a", json!("for-a")).await;
    helpers::assert_silent(&mut rx).await;

    engine.notifier().emit("b", json!("for-b")).await;
    let frame = helpers::recv_frame(&mut rx).await;
    assert_eq!(frame["data"], json!("for-b"));
}

#[tokio::test]
async fn test_slow_member_is_disconnected_without_blocking_others() {
    let engine = helpers::engine(1);
    let (slow, _slow_rx) = engine.register_connection("slow").await;
    let (fast, mut fast_rx) = engine.register_connection("fast").await;
    engine.hub().join(slow.clone(), "general").await;
    engine.hub().join(fast.clone(), "general").await;

    // First publish fills both queues; the fast member drains, the slow
    // member does not.
    engine.notifier().emit("general", json!(1)).await;
    let first = helpers::recv_frame(&mut fast_rx).await;
    assert_eq!(first["data"], json!(1));

    // Second publish overflows the slow member's queue.
    engine.notifier().emit("general", json!(2)).await;
    let second = helpers::recv_frame(&mut fast_rx).await;
    assert_eq!(second["data"], json!(2));

    helpers::settle().await;
    assert!(!slow.is_alive());
    assert!(fast.is_alive());
    assert_eq!(engine.counts().await.connections, 1);

    // Fan-out to the survivor keeps working.
    engine.notifier().emit("general", json!(3)).await;
    let third = helpers::recv_frame(&mut fast_rx).await;
    assert_eq!(third["data"], json!(3));
}

#[tokio::test]
async fn test_abrupt_disconnect_purges_membership() {
    let engine = helpers::engine(16);
    let (handle, mut rx) = engine.register_connection("alice").await;
    engine.hub().join(handle.clone(), "abc").await;
    helpers::settle().await;
    assert_eq!(engine.counts().await.connections, 1);

    engine.hub().disconnect(handle.id).await;
    helpers::settle().await;

    assert_eq!(engine.counts().await.connections, 0);
    assert!(!handle.is_alive());

    engine.notifier().emit("abc", json!("after")).await;
    helpers::assert_silent(&mut rx).await;
}

#[tokio::test]
async fn test_removal_is_idempotent() {
    let engine = helpers::engine(16);
    let (handle, _rx) = engine.register_connection("alice").await;
    engine.hub().join(handle.clone(), "a").await;

    // Leave of a room that was never created, double leave, double
    // disconnect, disconnect of an unknown id: all no-ops.
    engine.hub().leave(handle.id, "never-created").await;
    engine.hub().leave(handle.id, "a").await;
    engine.hub().leave(handle.id, "a").await;
    engine.hub().disconnect(handle.id).await;
    engine.hub().disconnect(handle.id).await;
    engine.hub().disconnect(uuid::Uuid::new_v4()).await;

    helpers::settle().await;
    assert_eq!(engine.counts().await.connections, 0);
}

#[tokio::test]
async fn test_broadcast_reaches_every_registered_connection() {
    let engine = helpers::engine(16);
    let (_a, mut rx_a) = engine.register_connection("alice").await;
    let (_b, mut rx_b) = engine.register_connection("bob").await;

    engine.hub().broadcast(Bytes::from_static(b"maintenance")).await;

    let payload_a = tokio::time::timeout(std::time::Duration::from_secs(2), rx_a.recv())
        .await
        .unwrap()
        .unwrap();
    let payload_b = tokio::time::timeout(std::time::Duration::from_secs(2), rx_b.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload_a, Bytes::from_static(b"maintenance"));
    assert_eq!(payload_b, Bytes::from_static(b"maintenance"));
}

#[tokio::test]
async fn test_duplicate_identity_keeps_first_registry_entry() {
    let engine = helpers::engine(16);
    let (first, mut rx_first) = engine.register_connection("alice").await;
    let (second, mut rx_second) = engine.register_connection("alice").await;

    engine.hub().broadcast(Bytes::from_static(b"hello")).await;
    let payload = tokio::time::timeout(std::time::Duration::from_secs(2), rx_first.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload, Bytes::from_static(b"hello"));
    helpers::assert_silent(&mut rx_second).await;

    // The duplicate's disconnect must not evict the registered entry.
    engine.hub().disconnect(second.id).await;
    engine.hub().broadcast(Bytes::from_static(b"again")).await;
    let payload = tokio::time::timeout(std::time::Duration::from_secs(2), rx_first.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload, Bytes::from_static(b"again"));
    assert!(first.is_alive());
}

#[tokio::test]
async fn test_idle_room_is_evicted_after_drain() {
    let engine = helpers::engine(16);
    let (handle, _rx) = engine.register_connection("alice").await;
    engine.hub().join(handle.clone(), "ephemeral").await;
    helpers::settle().await;
    assert_eq!(engine.counts().await.rooms, 1);

    // Occupied rooms survive the sweep.
    engine.hub().sweep_idle().await;
    helpers::settle().await;
    assert_eq!(engine.counts().await.rooms, 1);

    engine.hub().leave(handle.id, "ephemeral").await;
    helpers::settle().await;
    engine.hub().sweep_idle().await;
    helpers::settle().await;
    assert_eq!(engine.counts().await.rooms, 0);
}

#[tokio::test]
async fn test_room_recreated_after_eviction() {
    let engine = helpers::engine(16);
    let (handle, mut rx) = engine.register_connection("alice").await;
    engine.hub().join(handle.clone(), "r").await;
    engine.hub().leave(handle.id, "r").await;
    engine.hub().sweep_idle().await;
    helpers::settle().await;
    assert_eq!(engine.counts().await.rooms, 0);

    engine.hub().join(handle.clone(), "r").await;
    engine.notifier().emit("r", json!("back")).await;
    let frame = helpers::recv_frame(&mut rx).await;
    assert_eq!(frame["data"], json!("back"));
}

#[tokio::test]
async fn test_shutdown_kills_connections_and_rooms() {
    let engine = helpers::engine(16);
    let (handle, _rx) = engine.register_connection("alice").await;
    engine.hub().join(handle.clone(), "r").await;
    helpers::settle().await;

    engine.shutdown().await;
    helpers::settle().await;

    assert!(!handle.is_alive());
    let counts = engine.counts().await;
    assert_eq!(counts.connections, 0);
    assert_eq!(counts.rooms, 0);
}
