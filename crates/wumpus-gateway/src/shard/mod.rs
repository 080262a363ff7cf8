//! Shard handles

mod shard;

pub use crate::socket::ShardEvent;
pub use shard::{Shard, ShardContext};
