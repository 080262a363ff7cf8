//! Gateway client entry point
//!
//! Run with:
//! ```bash
//! DISCORD_TOKEN=... cargo run -p wumpus-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use wumpus_common::{try_init_tracing, try_init_tracing_with_config, ClientConfig, TracingConfig};
use wumpus_gateway::{Client, ClientEvent, ClientOptions, ShardEvent, SocketEvent};
use wumpus_rest::{RestClient, RestClientConfig};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Gateway client stopped: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Make sure the failure is reported somewhere
            let _ = try_init_tracing();
            return Err(e).context("Failed to load configuration");
        }
    };

    let tracing_config =
        TracingConfig::for_environment(config.app.env).with_debug(config.gateway.debug);
    if let Err(e) = try_init_tracing_with_config(tracing_config) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        intents = %config.gateway.intents,
        shard_count = ?config.gateway.shard_count,
        "Configuration loaded"
    );

    let rest = RestClient::new(RestClientConfig {
        base_url: config.discord.api_url.clone(),
        ..RestClientConfig::default()
    })
    .context("Failed to build REST client")?;

    let client = Client::new(
        [config.gateway.intents],
        ClientOptions::from(&config),
        Arc::new(rest),
    );
    tokio::spawn(log_events(client.subscribe()));

    client
        .login(config.discord.token.clone())
        .await
        .context("Login failed")?;

    let outcome = tokio::select! {
        result = client.wait() => result.context("Shard stopped"),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
            Ok(())
        }
    };

    client.shutdown().await?;
    client.wait().await?;
    info!("Gateway client stopped");
    outcome
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<ClientEvent>) {
    loop {
        match events.recv().await {
            Ok(ClientEvent::Ready) => info!("Client ready"),
            Ok(ClientEvent::Shard(ShardEvent { shard_id, event })) => match event {
                SocketEvent::Ready => info!(shard_id, "Shard ready"),
                SocketEvent::Resumed => info!(shard_id, "Shard resumed"),
                SocketEvent::Closed(close) => {
                    info!(shard_id, code = close.code, recover = %close.recover, "Shard closed");
                }
                SocketEvent::Dispatch(message) => {
                    info!(shard_id, event = ?message.t, seq = ?message.s, "Dispatch");
                }
                _ => {}
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log lagging"),
            Err(RecvError::Closed) => break,
        }
    }
}
