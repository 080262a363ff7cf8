//! # wumpus-core
//!
//! Value objects shared by the gateway client: intent flags, shard identity,
//! and the models returned by gateway discovery.
//! This crate performs no I/O.

pub mod gateway;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use gateway::{BotGatewayInfo, GatewayInfo, SessionStartLimit};
pub use value_objects::{Intents, IntentsParseError, ShardInfo};
