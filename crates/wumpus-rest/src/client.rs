//! HTTP implementation of gateway discovery

use crate::{Endpoints, GatewayDiscovery, RestError, RestResult};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use wumpus_core::{BotGatewayInfo, GatewayInfo};

/// Configuration for the REST client
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// Versioned API base URL
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://discord.com/api/v10".to_string(),
            timeout_ms: 10_000,
            user_agent: format!("DiscordBot (wumpus, {})", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// REST client for the discovery endpoints
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    user_agent: String,
}

impl RestClient {
    /// Create a new REST client
    pub fn new(config: RestClientConfig) -> RestResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            endpoints: Endpoints::new(config.base_url),
            user_agent: config.user_agent,
        })
    }

    /// Create a client for the given base URL with default settings
    pub fn with_base_url(base_url: impl Into<String>) -> RestResult<Self> {
        Self::new(RestClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, token: Option<&str>) -> RestResult<T> {
        let mut request = self.http.get(url).header(USER_AGENT, &self.user_agent);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bot {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Discovery request failed");
            return Err(RestError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl GatewayDiscovery for RestClient {
    async fn gateway(&self) -> RestResult<GatewayInfo> {
        let info: GatewayInfo = self.get_json(&self.endpoints.gateway(), None).await?;
        tracing::debug!(url = %info.url, "Gateway discovered");
        Ok(info)
    }

    async fn gateway_bot(&self, token: &str) -> RestResult<BotGatewayInfo> {
        let info: BotGatewayInfo = self
            .get_json(&self.endpoints.gateway_bot(), Some(token))
            .await?;
        tracing::debug!(
            url = %info.url,
            shards = info.shards,
            remaining = info.session_start_limit.remaining,
            "Bot gateway discovered"
        );
        Ok(info)
    }
}
