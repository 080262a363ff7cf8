//! # wumpus-rest
//!
//! REST calls used to discover the gateway endpoint and the recommended shard count.

mod client;
mod discovery;
mod endpoints;
mod error;

pub use client::{RestClient, RestClientConfig};
pub use discovery::GatewayDiscovery;
pub use endpoints::Endpoints;
pub use error::{RestError, RestResult};
