//! Connection state machine
//!
//! One [`Socket`] per shard. It talks to the network through a [`Connector`],
//! schedules heartbeats with [`HeartbeatTimers`], and keeps its resumable
//! session in [`SessionState`].

mod heartbeat;
mod session;
mod socket;
mod transport;

pub use heartbeat::{BeatRecord, HeartbeatState, HeartbeatTimers, Tick};
pub use session::SessionState;
pub use socket::{ShardEvent, Socket, SocketCommand, SocketConfig, SocketEvent, SocketStatus};
pub use transport::{Connector, Frame, Transport, TransportEvent, TungsteniteConnector};

#[cfg(test)]
pub(crate) use transport::testing;
