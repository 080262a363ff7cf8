//! Shard orchestration

mod client;
mod events;
mod options;
mod readiness;

pub use client::Client;
pub use events::ClientEvent;
pub use options::{ClientOptions, DEFAULT_GATEWAY_VERSION};
pub use readiness::ReadyTracker;
