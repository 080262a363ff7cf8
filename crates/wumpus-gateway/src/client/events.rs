//! Client-level events

use crate::shard::ShardEvent;

/// Event published to client subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Relayed from one shard
    Shard(ShardEvent),
    /// Every shard has reported READY; sent once per client
    Ready,
}
