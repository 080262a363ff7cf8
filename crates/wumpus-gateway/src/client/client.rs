//! Sharded gateway client
//!
//! The [`Client`] decides how many shards to run, starts one [`Shard`] per
//! index and folds their readiness into a single [`ClientEvent::Ready`].

use super::{ClientEvent, ClientOptions, ReadyTracker};
use crate::error::{GatewayError, GatewayResult};
use crate::shard::{Shard, ShardContext};
use crate::socket::{Connector, SocketConfig, SocketStatus, TungsteniteConnector};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use wumpus_core::Intents;
use wumpus_rest::GatewayDiscovery;

/// Capacity of the client event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Gateway client orchestrating every shard
pub struct Client {
    intents: Intents,
    options: ClientOptions,
    discovery: Arc<dyn GatewayDiscovery>,
    connector: Arc<dyn Connector>,
    events: broadcast::Sender<ClientEvent>,
    shards: DashMap<u32, Arc<Shard>>,
    readiness: Arc<ReadyTracker>,
    shard_count: AtomicU32,
    started: AtomicBool,
}

impl Client {
    /// Create a client; `intents` are merged with bitwise OR
    pub fn new<I>(intents: I, options: ClientOptions, discovery: Arc<dyn GatewayDiscovery>) -> Self
    where
        I: IntoIterator<Item = Intents>,
    {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            intents: Intents::combine(intents),
            options,
            discovery,
            connector: Arc::new(TungsteniteConnector),
            events,
            shards: DashMap::new(),
            readiness: Arc::new(ReadyTracker::new()),
            shard_count: AtomicU32::new(0),
            started: AtomicBool::new(false),
        }
    }

    /// Replace the WebSocket connector
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn intents(&self) -> Intents {
        self.intents
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Subscribe to client events
    ///
    /// Subscribe before [`login`](Self::login) to observe every event.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Number of shards started; zero before login
    pub fn shard_count(&self) -> u32 {
        self.shard_count.load(Ordering::SeqCst)
    }

    pub fn shard(&self, index: u32) -> Option<Arc<Shard>> {
        self.shards.get(&index).map(|entry| entry.value().clone())
    }

    pub fn shard_status(&self, index: u32) -> Option<SocketStatus> {
        self.shards.get(&index).map(|entry| entry.status())
    }

    /// Check whether every shard has reported READY at least once
    pub fn is_ready(&self) -> bool {
        self.readiness.is_all_ready()
    }

    /// Determine the shard count and start every shard
    ///
    /// Fails without starting anything if discovery fails.
    pub async fn login(&self, token: impl Into<String>) -> GatewayResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(GatewayError::AlreadyStarted);
        }
        let token = token.into();

        let count = match self.resolve_shard_count(&token).await {
            Ok(count) => count,
            Err(e) => {
                self.started.store(false, Ordering::SeqCst);
                tracing::error!(error = %e, "Failed to determine shard count");
                return Err(e);
            }
        };

        if self.intents.has_privileged() {
            tracing::info!(intents = %self.intents, "Privileged intents requested");
        }
        tracing::info!(shards = count, intents = self.intents.bits(), "Starting shards");

        self.shard_count.store(count, Ordering::SeqCst);
        self.readiness.set_expected(count);

        let config = Arc::new(SocketConfig {
            token,
            intents: self.intents,
            compress: self.options.compress,
            debug: self.options.debug,
            gateway_version: self.options.gateway_version,
            max_missed_heartbeat_acks: self.options.max_missed_heartbeat_acks,
        });
        let context = ShardContext {
            events: self.events.clone(),
            readiness: self.readiness.clone(),
            debug: self.options.debug,
        };

        for index in 0..count {
            let shard = Shard::spawn(
                index,
                count,
                config.clone(),
                self.discovery.clone(),
                self.connector.clone(),
                context.clone(),
            );
            self.shards.insert(index, Arc::new(shard));
        }

        Ok(())
    }

    async fn resolve_shard_count(&self, token: &str) -> GatewayResult<u32> {
        if let Some(count) = self.options.shard_count {
            return Ok(count.max(1));
        }
        let info = self.discovery.gateway_bot(token).await?;
        if self.options.debug {
            tracing::debug!(
                recommended = info.shards,
                remaining_sessions = info.session_start_limit.remaining,
                "Bot gateway info"
            );
        }
        Ok(info.recommended_shards())
    }

    /// Wait until every shard has stopped
    ///
    /// Resolves with the first shard error, such as a fatal close code.
    pub async fn wait(&self) -> GatewayResult<()> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(GatewayError::NotStarted);
        }

        let mut joins = JoinSet::new();
        for entry in &self.shards {
            let shard = entry.value().clone();
            joins.spawn(async move { shard.join().await });
        }

        while let Some(joined) = joins.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(GatewayError::ShardTask(e.to_string())),
            }
        }
        Ok(())
    }

    /// Close every shard with 4202
    pub async fn shutdown(&self) -> GatewayResult<()> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(GatewayError::NotStarted);
        }

        tracing::info!(shards = self.shard_count(), "Shutting down");
        let shards: Vec<Arc<Shard>> = self.shards.iter().map(|e| e.value().clone()).collect();
        for shard in shards {
            shard.disconnect().await;
        }
        Ok(())
    }
}
