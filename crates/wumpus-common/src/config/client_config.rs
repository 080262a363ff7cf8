//! Client configuration
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::fmt;
use wumpus_core::Intents;

/// Main client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub app: AppSettings,
    pub discord: DiscordConfig,
    pub gateway: GatewaySettings,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Credentials and REST settings
#[derive(Clone)]
pub struct DiscordConfig {
    /// Bot token
    pub token: String,
    /// REST base URL including the API version
    pub api_url: String,
    /// Gateway protocol version appended to the WebSocket URL
    pub gateway_version: u8,
}

// Keep the token out of logs
impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("gateway_version", &self.gateway_version)
            .finish()
    }
}

/// Gateway session settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub intents: Intents,
    /// Explicit shard count; skips the recommendation from `/gateway/bot`
    pub shard_count: Option<u32>,
    pub compress: bool,
    pub debug: bool,
    /// Missed heartbeat ACKs tolerated before forcing a resume
    pub max_missed_heartbeat_acks: Option<u32>,
}

// Default value functions
fn default_app_name() -> String {
    "wumpus".to_string()
}

fn default_api_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_gateway_version() -> u8 {
    10
}

fn default_intents() -> Intents {
    Intents::GUILDS
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if the token is missing or a value cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN")
            .or_else(|| lookup("BOT_TOKEN"))
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?;

        let intents = match lookup("DISCORD_INTENTS") {
            Some(raw) => Intents::parse(&raw)
                .map_err(|e| ConfigError::InvalidValue("DISCORD_INTENTS", e.to_string()))?,
            None => default_intents(),
        };

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            discord: DiscordConfig {
                token,
                api_url: lookup("DISCORD_API_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(default_api_url),
                gateway_version: parse_var(&lookup, "DISCORD_GATEWAY_VERSION")?
                    .unwrap_or_else(default_gateway_version),
            },
            gateway: GatewaySettings {
                intents,
                shard_count: parse_var(&lookup, "DISCORD_SHARD_COUNT")?,
                compress: parse_bool(&lookup, "DISCORD_COMPRESS")?.unwrap_or(false),
                debug: parse_bool(&lookup, "DISCORD_DEBUG")?.unwrap_or(false),
                max_missed_heartbeat_acks: parse_var(&lookup, "DISCORD_MAX_MISSED_ACKS")?,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue(key, raw.clone()))
        })
        .transpose()
}

fn parse_bool<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key, raw.clone())),
        })
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
