//! Test helpers for integration tests
//!
//! Builds clients pointed at a [`FakeGateway`] and waits on their events
//! with a timeout so a broken scenario fails instead of hanging.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::broadcast;
use wumpus_core::Intents;
use wumpus_gateway::{Client, ClientEvent, ClientOptions};
use wumpus_rest::RestClient;

use crate::{FakeGateway, Observed};

/// Upper bound for any single wait
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = wumpus_common::try_init_tracing();
}

/// Client using the fake gateway for discovery
pub fn client_for(gateway: &FakeGateway, options: ClientOptions) -> Result<Client> {
    init_tracing();
    let rest = RestClient::with_base_url(gateway.api_url())?;
    Ok(Client::new(
        [Intents::GUILDS, Intents::MESSAGE_CONTENT],
        ClientOptions {
            debug: true,
            ..options
        },
        Arc::new(rest),
    ))
}

/// Wait for the first event matching `predicate`
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<ClientEvent>,
    mut predicate: F,
) -> Result<ClientEvent>
where
    F: FnMut(&ClientEvent) -> bool,
{
    tokio::time::timeout(TEST_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return Ok(event),
                Ok(_) => {}
                Err(e) => return Err(anyhow!(e)),
            }
        }
    })
    .await
    .map_err(|_| anyhow!("timed out waiting for client event"))?
}

/// Wait for the first recorded frame matching `predicate`
pub async fn wait_for_frame<F>(gateway: &mut FakeGateway, mut predicate: F) -> Result<Observed>
where
    F: FnMut(&Observed) -> bool,
{
    tokio::time::timeout(TEST_TIMEOUT, async {
        while let Some(observed) = gateway.observed.recv().await {
            if predicate(&observed) {
                return Ok(observed);
            }
        }
        Err(anyhow!("fake gateway stopped"))
    })
    .await
    .map_err(|_| anyhow!("timed out waiting for gateway frame"))?
}
