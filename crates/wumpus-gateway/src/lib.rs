//! # wumpus-gateway
//!
//! Sharded gateway client: the per-shard connection state machine, the shard
//! handles wrapping it, and the client that starts them and aggregates
//! readiness.

pub mod client;
pub mod error;
pub mod protocol;
pub mod shard;
pub mod socket;

pub use client::{Client, ClientEvent, ClientOptions};
pub use error::{GatewayError, GatewayResult, ProtocolError};
pub use shard::{Shard, ShardEvent};
pub use socket::{SocketEvent, SocketStatus};
