//! Gateway Integration Tests
//!
//! Drive the full client (REST discovery, real WebSockets) against the
//! in-process fake gateway.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::{
    client_for, wait_for_event, wait_for_frame, AfterReady, FakeGateway, Route, VALID_TOKEN,
};
use serde_json::json;
use wumpus_gateway::{
    protocol::RecoverMethod, ClientEvent, ClientOptions, GatewayError, ShardEvent, SocketEvent,
    SocketStatus,
};

fn is_shard_ready(event: &ClientEvent) -> bool {
    matches!(
        event,
        ClientEvent::Shard(ShardEvent {
            event: SocketEvent::Ready,
            ..
        })
    )
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_two_shards_ready_aggregation() {
    let mut gateway = FakeGateway::start(2, AfterReady::Idle).await.unwrap();
    let client = client_for(&gateway, ClientOptions::default()).unwrap();
    let mut events = client.subscribe();

    client.login(VALID_TOKEN).await.unwrap();
    assert_eq!(client.shard_count(), 2);

    // Both shards identify with the merged intents and their own shard pair
    let mut shards = Vec::new();
    for _ in 0..2 {
        let identify = wait_for_frame(&mut gateway, |o| o.op() == Some(2))
            .await
            .unwrap();
        assert_eq!(identify.message["d"]["token"], VALID_TOKEN);
        assert_eq!(identify.message["d"]["intents"], 32769);
        assert_eq!(identify.message["d"]["compress"], false);
        shards.push(identify.message["d"]["shard"].clone());
    }
    shards.sort_by_key(|s| s[0].as_u64());
    assert_eq!(shards, vec![json!([0, 2]), json!([1, 2])]);

    // Overall ready only after both shard readies, and only once
    let mut shard_readies = 0;
    loop {
        let event = wait_for_event(&mut events, |_| true).await.unwrap();
        if is_shard_ready(&event) {
            shard_readies += 1;
        }
        if event == ClientEvent::Ready {
            break;
        }
    }
    assert_eq!(shard_readies, 2);
    assert!(client.is_ready());
    assert_eq!(client.shard_status(0), Some(SocketStatus::Connected));
    assert_eq!(client.shard_status(1), Some(SocketStatus::Connected));

    client.shutdown().await.unwrap();
    client.wait().await.unwrap();
    while let Ok(event) = events.try_recv() {
        assert_ne!(event, ClientEvent::Ready);
    }
}

#[tokio::test]
async fn test_shard_count_override_skips_recommendation() {
    let mut gateway = FakeGateway::start(4, AfterReady::Idle).await.unwrap();
    let options = ClientOptions {
        shard_count: Some(1),
        ..ClientOptions::default()
    };
    let client = client_for(&gateway, options).unwrap();
    let mut events = client.subscribe();

    // The override means the token never reaches /gateway/bot
    client.login("not-checked").await.unwrap();
    assert_eq!(client.shard_count(), 1);

    let identify = wait_for_frame(&mut gateway, |o| o.op() == Some(2))
        .await
        .unwrap();
    assert_eq!(identify.message["d"]["shard"], json!([0, 1]));
    wait_for_event(&mut events, |e| *e == ClientEvent::Ready)
        .await
        .unwrap();

    client.shutdown().await.unwrap();
    client.wait().await.unwrap();
}

#[tokio::test]
async fn test_rejected_token_fails_login() {
    let gateway = FakeGateway::start(1, AfterReady::Idle).await.unwrap();
    let client = client_for(&gateway, ClientOptions::default()).unwrap();

    let err = client.login("wrong").await.unwrap_err();
    match err {
        GatewayError::Discovery(e) => assert!(e.is_unauthorized()),
        other => panic!("expected discovery error, got {other}"),
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(gateway.connection_count(), 0);
    assert_eq!(client.shard_count(), 0);
}

// ============================================================================
// Close handling
// ============================================================================

#[tokio::test]
async fn test_disallowed_intents_is_fatal() {
    let gateway = FakeGateway::start(1, AfterReady::Close(4014)).await.unwrap();
    let client = client_for(&gateway, ClientOptions::default()).unwrap();
    let mut events = client.subscribe();

    client.login(VALID_TOKEN).await.unwrap();

    let err = tokio::time::timeout(Duration::from_secs(10), client.wait())
        .await
        .unwrap()
        .unwrap_err();
    let protocol = err.as_protocol().expect("protocol error");
    assert_eq!(protocol.code, 4014);
    assert_eq!(protocol.recover, RecoverMethod::Disconnect);
    assert_eq!(protocol.shard_id, 0);
    assert!(err.to_string().contains("Code: 4014"));

    let closed = wait_for_event(&mut events, |e| {
        matches!(
            e,
            ClientEvent::Shard(ShardEvent {
                event: SocketEvent::Closed(_),
                ..
            })
        )
    })
    .await
    .unwrap();
    let ClientEvent::Shard(ShardEvent {
        event: SocketEvent::Closed(close),
        ..
    }) = closed
    else {
        unreachable!();
    };
    assert_eq!(close.code, 4014);
    assert_eq!(close.recover, RecoverMethod::Disconnect);

    // No resume or reconnect follows
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(gateway.connection_count(), 1);
    assert_eq!(client.shard_status(0), Some(SocketStatus::Idle));
}

#[tokio::test]
async fn test_session_timeout_reconnects_with_fresh_session() {
    let mut gateway = FakeGateway::start(1, AfterReady::Close(4009)).await.unwrap();
    let client = client_for(&gateway, ClientOptions::default()).unwrap();
    let mut events = client.subscribe();

    client.login(VALID_TOKEN).await.unwrap();

    let first = wait_for_frame(&mut gateway, |o| o.op() == Some(2))
        .await
        .unwrap();
    assert_eq!(first.connection, 0);

    // A second Identify on a fresh connection, never a Resume
    let second = wait_for_frame(&mut gateway, |o| o.op() == Some(2) || o.op() == Some(6))
        .await
        .unwrap();
    assert_eq!(second.op(), Some(2));
    assert_eq!(second.route, Route::Fresh);
    assert_eq!(second.connection, 1);

    // READY arrives twice; the overall signal only once
    let mut shard_readies = 0;
    let mut overall = 0;
    while shard_readies < 2 {
        let event = wait_for_event(&mut events, |_| true).await.unwrap();
        if is_shard_ready(&event) {
            shard_readies += 1;
        }
        if event == ClientEvent::Ready {
            overall += 1;
        }
    }
    assert_eq!(overall, 1);

    client.shutdown().await.unwrap();
    client.wait().await.unwrap();
}

// ============================================================================
// Server-requested reconnect
// ============================================================================

#[tokio::test]
async fn test_reconnect_request_resumes_session() {
    let mut gateway = FakeGateway::start(1, AfterReady::RequestReconnect)
        .await
        .unwrap();
    let client = client_for(&gateway, ClientOptions::default()).unwrap();
    let mut events = client.subscribe();

    client.login(VALID_TOKEN).await.unwrap();

    let resume = wait_for_frame(&mut gateway, |o| o.op() == Some(6))
        .await
        .unwrap();
    assert_eq!(resume.route, Route::Resume);
    assert_eq!(
        resume.message["d"],
        json!({"token": VALID_TOKEN, "session_id": "session-0-0", "seq": 2})
    );

    wait_for_event(&mut events, |e| {
        matches!(
            e,
            ClientEvent::Shard(ShardEvent {
                event: SocketEvent::Resumed,
                ..
            })
        )
    })
    .await
    .unwrap();
    assert_eq!(client.shard_status(0), Some(SocketStatus::Connected));

    // Resuming never identifies again
    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(observed) = gateway.observed.try_recv() {
        assert_ne!(observed.op(), Some(2), "unexpected identify: {observed:?}");
    }
    assert_eq!(gateway.connection_count(), 2);

    client.shutdown().await.unwrap();
    client.wait().await.unwrap();
}
