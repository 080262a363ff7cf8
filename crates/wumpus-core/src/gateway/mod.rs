//! Gateway discovery models
//!
//! Responses of the REST endpoints used to locate the gateway.

mod info;

pub use info::{BotGatewayInfo, GatewayInfo, SessionStartLimit};
