//! Payload definitions
//!
//! Typed bodies carried in the `d` field of the envelope.

use serde::{Deserialize, Serialize};
use wumpus_core::{Intents, ShardInfo};

/// Library name reported in Identify properties
pub const LIBRARY_NAME: &str = "wumpus";

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload for op 2 (Identify)
///
/// Opens a fresh session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: IdentifyProperties,
    pub intents: Intents,
    pub compress: bool,
    pub shard: ShardInfo,
}

impl IdentifyPayload {
    #[must_use]
    pub fn new(token: impl Into<String>, intents: Intents, compress: bool, shard: ShardInfo) -> Self {
        Self {
            token: token.into(),
            properties: IdentifyProperties::default(),
            intents,
            compress,
            shard,
        }
    }
}

/// Client connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: LIBRARY_NAME.to_string(),
            device: LIBRARY_NAME.to_string(),
        }
    }
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    /// Last sequence number observed; null if no dispatch arrived yet
    pub seq: Option<u64>,
}

/// Body of the READY dispatch
///
/// Only the fields needed to resume are decoded; everything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub session_id: String,
    pub resume_gateway_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<ShardInfo>,
}
