//! `GET /gateway` and `GET /gateway/bot` response bodies

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Response of `GET /gateway`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    /// WebSocket URL to connect to
    pub url: String,
}

/// Response of `GET /gateway/bot`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotGatewayInfo {
    /// WebSocket URL to connect to
    pub url: String,
    /// Recommended number of shards
    pub shards: u32,
    /// Identify budget for the current window
    pub session_start_limit: SessionStartLimit,
}

impl BotGatewayInfo {
    /// Recommended shard count, never less than one
    #[must_use]
    pub fn recommended_shards(&self) -> u32 {
        self.shards.max(1)
    }
}

/// Session start limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartLimit {
    /// Total session starts allowed per window
    pub total: u32,
    /// Remaining session starts
    pub remaining: u32,
    /// Milliseconds until the limit resets
    pub reset_after: u64,
    /// Identify requests allowed per 5 seconds
    pub max_concurrency: u32,
}

impl SessionStartLimit {
    /// Point in time at which `remaining` resets, relative to `now`
    #[must_use]
    pub fn resets_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let after = Duration::milliseconds(i64::try_from(self.reset_after).unwrap_or(i64::MAX));
        now.checked_add_signed(after).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether at least `shards` sessions can still be started
    #[must_use]
    pub fn can_start(&self, shards: u32) -> bool {
        self.remaining >= shards
    }
}
