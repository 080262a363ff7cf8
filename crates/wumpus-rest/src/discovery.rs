//! Gateway discovery seam

use crate::RestResult;
use async_trait::async_trait;
use wumpus_core::{BotGatewayInfo, GatewayInfo};

/// Locates the gateway endpoint
///
/// Implemented over HTTP by [`crate::RestClient`]; tests substitute their own.
#[async_trait]
pub trait GatewayDiscovery: Send + Sync {
    /// `GET /gateway`: the WebSocket URL, no credential required
    async fn gateway(&self) -> RestResult<GatewayInfo>;

    /// `GET /gateway/bot`: URL plus recommended shard count
    async fn gateway_bot(&self, token: &str) -> RestResult<BotGatewayInfo>;
}
