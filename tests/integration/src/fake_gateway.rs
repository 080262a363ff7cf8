//! In-process fake gateway
//!
//! Serves `GET /api/gateway`, `GET /api/gateway/bot` and two WebSocket
//! routes: `/` for fresh sessions and `/resume/` for resumed ones. Every
//! frame the client sends is recorded for assertions.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Heartbeat interval announced in Hello
pub const HEARTBEAT_INTERVAL_MS: u64 = 45_000;

/// Token the fake REST endpoint accepts
pub const VALID_TOKEN: &str = "test-token";

/// What the first session does once READY has been sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterReady {
    /// Keep serving heartbeats
    Idle,
    /// Close the connection with this code
    Close(u16),
    /// Send one dispatch, then op 7
    RequestReconnect,
}

/// Route a connection arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Fresh,
    Resume,
}

/// Frame received from the client
#[derive(Debug, Clone)]
pub struct Observed {
    pub route: Route,
    /// Connection number, counted across both routes from zero
    pub connection: usize,
    pub message: Value,
}

impl Observed {
    pub fn op(&self) -> Option<u64> {
        self.message["op"].as_u64()
    }
}

#[derive(Clone)]
struct GatewayState {
    ws_url: String,
    shards: u32,
    after_ready: AfterReady,
    connections: Arc<AtomicUsize>,
    observed: mpsc::UnboundedSender<Observed>,
}

/// Running fake gateway
pub struct FakeGateway {
    pub addr: SocketAddr,
    pub observed: mpsc::UnboundedReceiver<Observed>,
    connections: Arc<AtomicUsize>,
    _handle: JoinHandle<()>,
}

impl FakeGateway {
    /// Start a fake gateway recommending `shards` shards
    pub async fn start(shards: u32, after_ready: AfterReady) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let (tx, observed) = mpsc::unbounded_channel();
        let connections = Arc::new(AtomicUsize::new(0));
        let state = GatewayState {
            ws_url: format!("ws://{addr}"),
            shards,
            after_ready,
            connections: connections.clone(),
            observed: tx,
        };

        let app = Router::new()
            .route("/api/gateway", get(gateway))
            .route("/api/gateway/bot", get(gateway_bot))
            .route("/", get(fresh_session))
            .route("/resume/", get(resumed_session))
            .with_state(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            observed,
            connections,
            _handle: handle,
        })
    }

    /// REST base URL to hand to the discovery client
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// WebSocket connections accepted so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn gateway(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({ "url": state.ws_url }))
}

async fn gateway_bot(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bot {VALID_TOKEN}"));
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "401: Unauthorized").into_response();
    }

    Json(json!({
        "url": state.ws_url,
        "shards": state.shards,
        "session_start_limit": {
            "total": 1000,
            "remaining": 1000,
            "reset_after": 0,
            "max_concurrency": 1
        }
    }))
    .into_response()
}

async fn fresh_session(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_fresh(state, socket))
}

async fn resumed_session(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_resumed(state, socket))
}

async fn send_json(socket: &mut WebSocket, value: Value) -> bool {
    socket.send(Message::Text(value.to_string())).await.is_ok()
}

async fn next_json(socket: &mut WebSocket) -> Option<Value> {
    while let Some(Ok(message)) = socket.next().await {
        match message {
            Message::Text(text) => return serde_json::from_str(&text).ok(),
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

fn hello() -> Value {
    json!({"op": 10, "d": {"heartbeat_interval": HEARTBEAT_INTERVAL_MS}})
}

async fn serve_fresh(state: GatewayState, mut socket: WebSocket) {
    let connection = state.connections.fetch_add(1, Ordering::SeqCst);
    let mut sequence = 0_u64;

    if !send_json(&mut socket, hello()).await {
        return;
    }

    while let Some(message) = next_json(&mut socket).await {
        let _ = state.observed.send(Observed {
            route: Route::Fresh,
            connection,
            message: message.clone(),
        });

        match message["op"].as_u64() {
            Some(1) => {
                send_json(&mut socket, json!({"op": 11})).await;
            }
            Some(2) => {
                let shard = message["d"]["shard"].clone();
                let shard_id = shard[0].as_u64().unwrap_or_default();
                sequence += 1;
                send_json(
                    &mut socket,
                    json!({
                        "op": 0,
                        "s": sequence,
                        "t": "READY",
                        "d": {
                            "v": 10,
                            "session_id": format!("session-{shard_id}-{connection}"),
                            "resume_gateway_url": format!("{}/resume", state.ws_url),
                            "shard": shard
                        }
                    }),
                )
                .await;

                if connection == 0 && !after_ready(&mut socket, state.after_ready, &mut sequence).await {
                    return;
                }
            }
            _ => {}
        }
    }
}

/// Returns false once the connection has been closed
async fn after_ready(socket: &mut WebSocket, behavior: AfterReady, sequence: &mut u64) -> bool {
    match behavior {
        AfterReady::Idle => true,
        AfterReady::Close(code) => {
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code,
                    reason: "".into(),
                })))
                .await;
            false
        }
        AfterReady::RequestReconnect => {
            *sequence += 1;
            send_json(
                socket,
                json!({"op": 0, "s": *sequence, "t": "GUILD_CREATE", "d": {"id": "1"}}),
            )
            .await;
            send_json(socket, json!({"op": 7, "d": null})).await;
            true
        }
    }
}

async fn serve_resumed(state: GatewayState, mut socket: WebSocket) {
    let connection = state.connections.fetch_add(1, Ordering::SeqCst);

    // Resume is sent as soon as the socket opens, before Hello
    let Some(resume) = next_json(&mut socket).await else {
        return;
    };
    let last = resume["d"]["seq"].as_u64().unwrap_or_default();
    let _ = state.observed.send(Observed {
        route: Route::Resume,
        connection,
        message: resume,
    });

    if !send_json(&mut socket, hello()).await {
        return;
    }
    send_json(
        &mut socket,
        json!({"op": 0, "s": last + 1, "t": "RESUMED", "d": {}}),
    )
    .await;

    while let Some(message) = next_json(&mut socket).await {
        let _ = state.observed.send(Observed {
            route: Route::Resume,
            connection,
            message: message.clone(),
        });
        if message["op"].as_u64() == Some(1) {
            send_json(&mut socket, json!({"op": 11})).await;
        }
    }
}
