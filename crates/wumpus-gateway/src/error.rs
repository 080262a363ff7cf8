//! Gateway error types

use crate::protocol::{CloseEvent, RecoverMethod};
use thiserror::Error;
use wumpus_rest::RestError;

/// Fatal protocol condition reported by one shard
///
/// Raised for close codes the client must not recover from on its own, and
/// also published as an event so observers see it without awaiting the shard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (Shard: #{shard_id}, Code: {code}, Recover: {recover})")]
pub struct ProtocolError {
    pub message: String,
    pub shard_id: u32,
    pub code: u16,
    pub recover: RecoverMethod,
}

impl ProtocolError {
    /// Build the error for a resolved close event
    #[must_use]
    pub fn from_close(shard_id: u32, close: CloseEvent) -> Self {
        let message = close.known().map_or_else(
            || format!("Unhandled close code {}", close.code),
            |code| code.description().to_string(),
        );
        Self {
            message,
            shard_id,
            code: close.code,
            recover: close.recover,
        }
    }
}

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A shard hit a fatal close code
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Gateway discovery failed
    #[error("Discovery failed: {0}")]
    Discovery(#[from] RestError),

    /// WebSocket could not be opened or written
    #[error("Transport error: {0}")]
    Transport(String),

    /// Outbound payload could not be encoded
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Resume requested with no cached session
    #[error("No session to resume")]
    MissingSession,

    /// `login` called more than once
    #[error("Client already started")]
    AlreadyStarted,

    /// Operation requires a started client
    #[error("Client not started")]
    NotStarted,

    /// Shard task panicked or was aborted
    #[error("Shard task failed: {0}")]
    ShardTask(String),
}

impl GatewayError {
    /// The protocol error, if this is a fatal close
    #[must_use]
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }

    /// Check if a fresh connection attempt may succeed where this one failed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Discovery(err) => !err.is_unauthorized(),
            _ => false,
        }
    }
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
