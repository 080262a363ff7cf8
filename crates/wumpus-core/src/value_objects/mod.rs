//! Value objects - immutable types that represent gateway concepts

mod intents;
mod shard_info;

pub use intents::{Intents, IntentsParseError};
pub use shard_info::ShardInfo;
