//! Shard handle
//!
//! A [`Shard`] owns the task running one [`Socket`] plus a relay task that
//! forwards the socket's shard-tagged events to the client.

use crate::client::{ClientEvent, ReadyTracker};
use crate::error::{GatewayError, GatewayResult};
use crate::socket::{
    Connector, ShardEvent, Socket, SocketCommand, SocketConfig, SocketEvent, SocketStatus,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use wumpus_rest::GatewayDiscovery;

/// Channel buffer size for socket commands
const COMMAND_BUFFER_SIZE: usize = 8;

/// What a shard shares with its client
#[derive(Clone)]
pub struct ShardContext {
    pub events: broadcast::Sender<ClientEvent>,
    pub readiness: Arc<ReadyTracker>,
    pub debug: bool,
}

struct ShardTasks {
    socket: JoinHandle<GatewayResult<()>>,
    relay: JoinHandle<()>,
}

/// Handle to one running shard
pub struct Shard {
    index: u32,
    id: Arc<AtomicU32>,
    status: watch::Receiver<SocketStatus>,
    commands: mpsc::Sender<SocketCommand>,
    tasks: Mutex<Option<ShardTasks>>,
}

impl Shard {
    /// Create the socket for shard `index` of `count` and start it
    pub fn spawn(
        index: u32,
        count: u32,
        config: Arc<SocketConfig>,
        discovery: Arc<dyn GatewayDiscovery>,
        connector: Arc<dyn Connector>,
        context: ShardContext,
    ) -> Self {
        let id = Arc::new(AtomicU32::new(index));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let socket = Socket::new(id.clone(), count, config, discovery, connector, events_tx);
        let status = socket.subscribe_status();
        let (commands, commands_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);

        let relay = tokio::spawn(relay_events(index, events_rx, context));
        let socket = tokio::spawn(socket.run(commands_rx));

        Self {
            index,
            id,
            status,
            commands,
            tasks: Mutex::new(Some(ShardTasks { socket, relay })),
        }
    }

    /// Index this shard was started with
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Current shard id, as corrected by READY
    pub fn id(&self) -> u32 {
        self.id.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> SocketStatus {
        *self.status.borrow()
    }

    /// Watch status changes
    pub fn watch_status(&self) -> watch::Receiver<SocketStatus> {
        self.status.clone()
    }

    /// Ask the socket to close with 4202 and stop
    pub async fn disconnect(&self) {
        // Already stopped if the socket dropped its receiver
        let _ = self.commands.send(SocketCommand::Disconnect).await;
    }

    /// Wait for the shard to stop
    ///
    /// Resolves with the socket's outcome once every event has been relayed.
    /// Later calls resolve immediately with `Ok`.
    pub async fn join(&self) -> GatewayResult<()> {
        let mut guard = self.tasks.lock().await;
        let Some(tasks) = guard.as_mut() else {
            return Ok(());
        };

        let outcome = (&mut tasks.socket)
            .await
            .map_err(|e| GatewayError::ShardTask(e.to_string()))
            .and_then(|result| result);
        if let Err(e) = (&mut tasks.relay).await {
            tracing::warn!(shard_id = self.id(), error = %e, "Relay task failed");
        }

        *guard = None;
        outcome
    }
}

impl Drop for Shard {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.tasks.try_lock() {
            if let Some(tasks) = guard.take() {
                tasks.socket.abort();
            }
        }
    }
}

async fn relay_events(
    index: u32,
    mut events: mpsc::UnboundedReceiver<ShardEvent>,
    context: ShardContext,
) {
    while let Some(tagged) = events.recv().await {
        log_event(tagged.shard_id, &tagged.event, context.debug);

        let ready = matches!(tagged.event, SocketEvent::Ready);
        // No subscribers is fine
        let _ = context.events.send(ClientEvent::Shard(tagged));

        if ready && context.readiness.mark_ready(index) {
            tracing::info!(shards = context.readiness.expected(), "All shards ready");
            let _ = context.events.send(ClientEvent::Ready);
        }
    }
}

fn log_event(shard_id: u32, event: &SocketEvent, debug: bool) {
    match event {
        SocketEvent::Error(error) => {
            tracing::error!(shard_id, error = %error, "Shard error");
        }
        SocketEvent::Closed(close) if debug => {
            tracing::debug!(shard_id, code = close.code, recover = %close.recover, "Shard closed");
        }
        SocketEvent::Hello { heartbeat_interval } if debug => {
            tracing::debug!(
                shard_id,
                interval_ms = heartbeat_interval.as_millis() as u64,
                "Hello received"
            );
        }
        SocketEvent::Heartbeat { latency } if debug => {
            tracing::debug!(shard_id, latency_ms = latency.as_millis() as u64, "Heartbeat");
        }
        SocketEvent::Dispatch(message) if debug => {
            tracing::trace!(shard_id, event = ?message.t, seq = ?message.s, "Dispatch");
        }
        _ => {}
    }
}
