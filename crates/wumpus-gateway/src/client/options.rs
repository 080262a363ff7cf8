//! Client options

use wumpus_common::ClientConfig;

/// Default gateway protocol version
pub const DEFAULT_GATEWAY_VERSION: u8 = 10;

/// Options bundle passed to [`Client::new`](super::Client::new)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Forwarded in Identify
    pub compress: bool,
    /// Explicit shard count; wins over the recommendation from discovery
    pub shard_count: Option<u32>,
    /// Enables debug-level logging at the call sites
    pub debug: bool,
    /// Missed heartbeat acks before forcing a resume; `None` only logs
    pub max_missed_heartbeat_acks: Option<u32>,
    pub gateway_version: u8,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            compress: false,
            shard_count: None,
            debug: false,
            max_missed_heartbeat_acks: None,
            gateway_version: DEFAULT_GATEWAY_VERSION,
        }
    }
}

impl From<&ClientConfig> for ClientOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            compress: config.gateway.compress,
            shard_count: config.gateway.shard_count,
            debug: config.gateway.debug,
            max_missed_heartbeat_acks: config.gateway.max_missed_heartbeat_acks,
            gateway_version: config.discord.gateway_version,
        }
    }
}
