//! Integration test utilities for the gateway client
//!
//! Provides an in-process fake gateway (REST discovery plus WebSocket) and
//! helpers for waiting on client events.

pub mod fake_gateway;
pub mod helpers;

pub use fake_gateway::*;
pub use helpers::*;
