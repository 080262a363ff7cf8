//! Per-shard connection state machine
//!
//! A [`Socket`] owns one shard's session: it connects, identifies, keeps the
//! heartbeat going, and resumes or reconnects according to the close-code
//! policy. All of its state is mutated from the single task running
//! [`Socket::run`]; timers and the transport talk to it over channels.

use super::heartbeat::{HeartbeatState, Tick};
use super::session::SessionState;
use super::transport::{Connector, Frame, Transport, TransportEvent};
use crate::error::{GatewayError, GatewayResult, ProtocolError};
use crate::protocol::{
    CloseCode, CloseEvent, DispatchEvent, GatewayMessage, GatewayPayload, HelloPayload,
    IdentifyPayload, RecoverMethod,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use wumpus_core::{Intents, ShardInfo};
use wumpus_rest::GatewayDiscovery;

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketStatus {
    Idle,
    Connecting,
    Resuming,
    Connected,
}

impl std::fmt::Display for SocketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Resuming => "Resuming",
            Self::Connected => "Connected",
        };
        f.write_str(name)
    }
}

/// Event published by a socket
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Hello { heartbeat_interval: Duration },
    Heartbeat { latency: Duration },
    Ready,
    Resumed,
    Dispatch(GatewayMessage),
    Closed(CloseEvent),
    Error(ProtocolError),
}

/// Socket event tagged with the shard id in effect when it was emitted
#[derive(Debug, Clone, PartialEq)]
pub struct ShardEvent {
    pub shard_id: u32,
    pub event: SocketEvent,
}

/// Command sent to a running socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketCommand {
    /// Close with 4202 and stop
    Disconnect,
}

/// Settings shared by every socket of one client
#[derive(Clone)]
pub struct SocketConfig {
    pub token: String,
    pub intents: Intents,
    pub compress: bool,
    pub debug: bool,
    pub gateway_version: u8,
    /// Missed acks tolerated before closing with 4201 and resuming
    pub max_missed_heartbeat_acks: Option<u32>,
}

impl std::fmt::Debug for SocketConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketConfig")
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("compress", &self.compress)
            .field("debug", &self.debug)
            .field("gateway_version", &self.gateway_version)
            .field("max_missed_heartbeat_acks", &self.max_missed_heartbeat_acks)
            .finish()
    }
}

/// Fresh-connect attempts after a recovery fails to reach the gateway
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubled for each later one
const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Connection state machine for one shard
pub struct Socket {
    shard_id: Arc<AtomicU32>,
    shard_count: u32,
    config: Arc<SocketConfig>,
    discovery: Arc<dyn GatewayDiscovery>,
    connector: Arc<dyn Connector>,

    status: watch::Sender<SocketStatus>,
    transport: Option<Transport>,
    session: SessionState,
    heartbeat: HeartbeatState,
    identified: bool,

    ticks_tx: mpsc::UnboundedSender<Tick>,
    ticks_rx: mpsc::UnboundedReceiver<Tick>,

    events: mpsc::UnboundedSender<ShardEvent>,
}

impl Socket {
    /// Create a socket for shard `shard_id` of `shard_count`
    ///
    /// `shard_id` is shared with the owning handle so a server-side
    /// correction from READY is visible there.
    pub fn new(
        shard_id: Arc<AtomicU32>,
        shard_count: u32,
        config: Arc<SocketConfig>,
        discovery: Arc<dyn GatewayDiscovery>,
        connector: Arc<dyn Connector>,
        events: mpsc::UnboundedSender<ShardEvent>,
    ) -> Self {
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SocketStatus::Idle);
        Self {
            shard_id,
            shard_count,
            config,
            discovery,
            connector,
            status,
            transport: None,
            session: SessionState::default(),
            heartbeat: HeartbeatState::default(),
            identified: false,
            ticks_tx,
            ticks_rx,
            events,
        }
    }

    /// Watch the connection status
    pub fn subscribe_status(&self) -> watch::Receiver<SocketStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SocketStatus {
        *self.status.borrow()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    fn shard_id(&self) -> u32 {
        self.shard_id.load(Ordering::Relaxed)
    }

    fn set_status(&self, status: SocketStatus) {
        self.status.send_replace(status);
    }

    fn emit(&self, event: SocketEvent) {
        // The handle may already be gone during teardown
        let _ = self.events.send(ShardEvent {
            shard_id: self.shard_id(),
            event,
        });
    }

    /// Connect and drive the session until a deliberate disconnect or a fatal error
    ///
    /// The status is `Idle` whenever this returns.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SocketCommand>) -> GatewayResult<()> {
        let outcome = self.drive(&mut commands).await;
        if outcome.is_err() {
            self.heartbeat.cancel();
            self.transport = None;
            self.set_status(SocketStatus::Idle);
        }
        outcome
    }

    async fn drive(&mut self, commands: &mut mpsc::Receiver<SocketCommand>) -> GatewayResult<()> {
        self.connect().await?;

        while self.status() != SocketStatus::Idle {
            let step = tokio::select! {
                command = commands.recv() => match command {
                    Some(SocketCommand::Disconnect) | None => {
                        self.disconnect(CloseEvent::close(), "Disconnect requested").await;
                        Ok(())
                    }
                },
                Some(tick) = self.ticks_rx.recv() => {
                    if self.heartbeat.is_current(tick) {
                        self.on_heartbeat_tick().await
                    } else {
                        Ok(())
                    }
                }
                event = next_transport_event(&mut self.transport) => {
                    self.on_transport_event(event).await
                }
            };
            if let Err(e) = step {
                self.reconnect_after(e).await?;
            }
        }

        Ok(())
    }

    /// Fall back to fresh connects after a recovery step failed
    ///
    /// Only transient failures are retried, at most [`MAX_RECONNECT_ATTEMPTS`]
    /// times with a doubling delay.
    async fn reconnect_after(&mut self, error: GatewayError) -> GatewayResult<()> {
        if !error.is_transient() {
            return Err(error);
        }

        let mut last = error;
        let mut delay = RECONNECT_BASE_DELAY;
        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            tracing::warn!(
                shard_id = self.shard_id(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last,
                "Recovery failed, reconnecting"
            );
            tokio::time::sleep(delay).await;
            delay *= 2;

            match self.connect().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() => last = e,
                Err(e) => return Err(e),
            }
        }

        tracing::error!(shard_id = self.shard_id(), error = %last, "Giving up on reconnecting");
        Err(last)
    }

    /// Open a fresh session
    pub async fn connect(&mut self) -> GatewayResult<()> {
        self.set_status(SocketStatus::Connecting);
        self.detach(CloseCode::Normal).await;
        self.session.clear();
        self.identified = false;

        let info = self.discovery.gateway().await?;
        let transport = self.open(&info.url).await?;
        self.transport = Some(transport);
        self.set_status(SocketStatus::Connected);

        if self.config.debug {
            tracing::debug!(shard_id = self.shard_id(), "Opened websocket connection");
        }
        Ok(())
    }

    /// Reopen the cached session and replay missed events
    pub async fn resume(&mut self) -> GatewayResult<()> {
        self.set_status(SocketStatus::Resuming);
        self.detach(CloseCode::Resuming).await;

        let (Some(url), Some(payload)) = (
            self.session.resume_url.clone(),
            self.session.resume_payload(&self.config.token),
        ) else {
            tracing::warn!(shard_id = self.shard_id(), "No cached session to resume");
            self.set_status(SocketStatus::Idle);
            return Err(GatewayError::MissingSession);
        };

        if self.config.debug {
            tracing::debug!(
                shard_id = self.shard_id(),
                seq = ?payload.seq,
                "Resuming session"
            );
        }

        let transport = self.open(&url).await?;
        self.transport = Some(transport);
        self.send(GatewayMessage::resume(&payload)?).await;
        Ok(())
    }

    /// Stop heartbeats, close the transport and go idle
    pub async fn disconnect(&mut self, close: CloseEvent, reason: &str) {
        self.set_status(SocketStatus::Idle);
        self.heartbeat.cancel();

        if let Some(transport) = self.transport.take() {
            let Transport { sender, events } = transport;
            // Nothing more is read from this connection
            drop(events);
            let _ = sender
                .send(Frame::Close {
                    code: close.code,
                    reason: reason.to_string(),
                })
                .await;
        }

        if self.config.debug {
            tracing::debug!(shard_id = self.shard_id(), code = close.code, "Disconnected");
        }
        self.emit(SocketEvent::Closed(close));
    }

    /// Apply a close event's recovery method
    pub async fn recover(&mut self, close: CloseEvent) -> GatewayResult<()> {
        match close.recover {
            RecoverMethod::Resume => self.resume_or_connect().await,
            RecoverMethod::Reconnect => self.connect().await,
            RecoverMethod::Disconnect => {
                self.disconnect(close, close.known().map_or("", CloseCode::description))
                    .await;
                Ok(())
            }
        }
    }

    /// Resume when a session is cached, otherwise start a fresh one
    async fn resume_or_connect(&mut self) -> GatewayResult<()> {
        if self.session.can_resume() {
            self.resume().await
        } else {
            tracing::info!(shard_id = self.shard_id(), "No session to resume, reconnecting");
            self.connect().await
        }
    }

    async fn open(&self, base: &str) -> GatewayResult<Transport> {
        let url = format!(
            "{}/?v={}&encoding=json",
            base.trim_end_matches('/'),
            self.config.gateway_version
        );
        if self.config.debug {
            tracing::debug!(shard_id = self.shard_id(), url = %url, "Connecting");
        }
        self.connector.open(&url).await
    }

    /// Drop the current transport, if any, along with its timers
    async fn detach(&mut self, code: CloseCode) {
        self.heartbeat.cancel();
        if let Some(transport) = self.transport.take() {
            let _ = transport
                .sender
                .send(Frame::Close {
                    code: code.as_u16(),
                    reason: code.description().to_string(),
                })
                .await;
        }
    }

    async fn send(&self, message: GatewayMessage) {
        let Some(transport) = &self.transport else {
            return;
        };
        match message.to_json() {
            Ok(json) => {
                if transport.sender.send(Frame::Text(json)).await.is_err() {
                    tracing::warn!(shard_id = self.shard_id(), "Transport writer is gone");
                }
            }
            Err(e) => {
                tracing::warn!(shard_id = self.shard_id(), error = %e, "Failed to encode message");
            }
        }
    }

    async fn on_transport_event(&mut self, event: TransportEvent) -> GatewayResult<()> {
        match event {
            TransportEvent::Message(text) => self.on_message(&text).await,
            TransportEvent::Error(error) => {
                tracing::warn!(shard_id = self.shard_id(), error = %error, "Transport error");
                Ok(())
            }
            TransportEvent::Closed { code } => self.on_close(code).await,
        }
    }

    async fn on_message(&mut self, text: &str) -> GatewayResult<()> {
        let decoded = GatewayMessage::from_json(text)
            .and_then(|message| GatewayPayload::decode(&message).map(|payload| (message, payload)));
        let (message, payload) = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(shard_id = self.shard_id(), error = %e, "Dropping malformed message");
                return Ok(());
            }
        };

        match payload {
            GatewayPayload::Hello(hello) => self.on_hello(hello).await,
            GatewayPayload::HeartbeatRequest => {
                if self.config.debug {
                    tracing::debug!(shard_id = self.shard_id(), "Heartbeat requested");
                }
                self.beat(false).await;
            }
            GatewayPayload::HeartbeatAck => {
                let latency = self.heartbeat.record_ack(Instant::now()).unwrap_or_default();
                if self.config.debug {
                    tracing::debug!(
                        shard_id = self.shard_id(),
                        latency_ms = latency.as_millis() as u64,
                        "Heartbeat acknowledged"
                    );
                }
                self.emit(SocketEvent::Heartbeat { latency });
            }
            GatewayPayload::Dispatch { sequence, event } => {
                self.session.observe_sequence(sequence);
                self.on_dispatch(event, message);
            }
            GatewayPayload::Reconnect => {
                tracing::info!(shard_id = self.shard_id(), "Reconnect requested by gateway");
                self.resume_or_connect().await?;
            }
            GatewayPayload::InvalidSession { resumable } => {
                tracing::warn!(shard_id = self.shard_id(), resumable, "Invalid session");
                if resumable {
                    self.resume_or_connect().await?;
                } else {
                    self.disconnect(CloseEvent::close(), "Invalid session").await;
                }
            }
            GatewayPayload::Unknown { op } => {
                tracing::warn!(shard_id = self.shard_id(), op, "Unhandled op code");
            }
        }

        Ok(())
    }

    async fn on_hello(&mut self, hello: HelloPayload) {
        let interval = Duration::from_millis(hello.heartbeat_interval);
        self.emit(SocketEvent::Hello {
            heartbeat_interval: interval,
        });

        if self.config.debug {
            tracing::debug!(
                shard_id = self.shard_id(),
                interval_ms = hello.heartbeat_interval,
                "Starting heartbeat"
            );
        }
        self.heartbeat.start(interval, self.ticks_tx.clone());

        if self.status() != SocketStatus::Resuming {
            self.identify().await;
        }
    }

    async fn identify(&mut self) {
        if self.identified {
            tracing::warn!(shard_id = self.shard_id(), "Already identified, skipping");
            return;
        }

        let payload = IdentifyPayload::new(
            self.config.token.clone(),
            self.config.intents,
            self.config.compress,
            ShardInfo::new(self.shard_id(), self.shard_count),
        );
        match GatewayMessage::identify(&payload) {
            Ok(message) => {
                if self.config.debug {
                    tracing::debug!(shard_id = self.shard_id(), "Sending identify");
                }
                self.send(message).await;
                self.identified = true;
            }
            Err(e) => {
                tracing::warn!(shard_id = self.shard_id(), error = %e, "Failed to encode identify");
            }
        }
    }

    fn on_dispatch(&mut self, event: DispatchEvent, message: GatewayMessage) {
        match event {
            DispatchEvent::Ready(ready) => {
                self.session.establish(&ready);
                if let Some(shard) = ready.shard {
                    self.shard_id.store(shard.id, Ordering::Relaxed);
                }
                self.set_status(SocketStatus::Connected);
                tracing::info!(
                    shard_id = self.shard_id(),
                    session_id = %ready.session_id,
                    "Shard ready"
                );
                self.emit(SocketEvent::Ready);
            }
            DispatchEvent::Resumed => {
                self.set_status(SocketStatus::Connected);
                tracing::info!(shard_id = self.shard_id(), "Session resumed");
                self.emit(SocketEvent::Resumed);
            }
            DispatchEvent::Other { .. } => self.emit(SocketEvent::Dispatch(message)),
        }
    }

    async fn on_heartbeat_tick(&mut self) -> GatewayResult<()> {
        let record = self.heartbeat.record_sent(Instant::now(), true);
        if let Some(limit) = self.config.max_missed_heartbeat_acks {
            if record.missed >= limit {
                tracing::warn!(
                    shard_id = self.shard_id(),
                    missed = record.missed,
                    "Zombie connection, resuming"
                );
                let close = CloseEvent::from(CloseCode::ZombieConnection);
                self.detach(CloseCode::ZombieConnection).await;
                self.emit(SocketEvent::Closed(close));
                return self.recover(close).await;
            }
        }
        self.send_heartbeat(record.ack_was_pending).await;
        Ok(())
    }

    async fn beat(&mut self, counts_missed: bool) {
        let record = self.heartbeat.record_sent(Instant::now(), counts_missed);
        self.send_heartbeat(record.ack_was_pending).await;
    }

    async fn send_heartbeat(&self, ack_was_pending: bool) {
        if ack_was_pending {
            tracing::warn!(
                shard_id = self.shard_id(),
                "Heartbeat ACK not received, possibly a zombie connection"
            );
        }
        if self.config.debug {
            tracing::debug!(shard_id = self.shard_id(), "Sending heartbeat");
        }
        self.send(GatewayMessage::heartbeat(self.session.last_sequence))
            .await;
    }

    async fn on_close(&mut self, code: Option<u16>) -> GatewayResult<()> {
        self.transport = None;
        self.heartbeat.cancel();

        if code.is_none() {
            tracing::warn!(shard_id = self.shard_id(), "Closed without a code");
        }
        let close = CloseEvent::resolve(code.unwrap_or(CloseCode::Abnormal.as_u16()));
        match close.known() {
            Some(known) => tracing::info!(
                shard_id = self.shard_id(),
                code = close.code,
                recover = %close.recover,
                "Connection closed: {}",
                known.description()
            ),
            None => tracing::warn!(
                shard_id = self.shard_id(),
                code = close.code,
                "Unhandled close code"
            ),
        }

        if close.is_fatal() {
            self.set_status(SocketStatus::Idle);
            self.emit(SocketEvent::Closed(close));
            let error = ProtocolError::from_close(self.shard_id(), close);
            tracing::error!(
                shard_id = error.shard_id,
                code = error.code,
                recover = %error.recover,
                "{}",
                error.message
            );
            self.emit(SocketEvent::Error(error.clone()));
            return Err(error.into());
        }

        // disconnect() reports the close itself
        if close.recover != RecoverMethod::Disconnect {
            self.emit(SocketEvent::Closed(close));
        }
        self.recover(close).await
    }
}

async fn next_transport_event(transport: &mut Option<Transport>) -> TransportEvent {
    match transport {
        Some(transport) => transport
            .events
            .recv()
            .await
            .unwrap_or(TransportEvent::Closed { code: None }),
        None => futures::future::pending().await,
    }
}
