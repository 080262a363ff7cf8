//! Typed view over inbound envelopes
//!
//! [`GatewayPayload::decode`] turns a raw [`GatewayMessage`] into a tagged
//! union keyed by op code and, for dispatches, by event name.

use super::{GatewayMessage, HelloPayload, OpCode, ReadyPayload};
use serde_json::Value;

/// Event name that establishes a session
pub const READY: &str = "READY";
/// Event name that confirms a resume
pub const RESUMED: &str = "RESUMED";

/// Decoded dispatch event
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    Ready(ReadyPayload),
    Resumed,
    /// Any other event; its body is passed through untouched
    Other { name: String, data: Value },
}

/// Decoded inbound envelope
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayPayload {
    Hello(HelloPayload),
    /// Server asked for an immediate heartbeat (op 1)
    HeartbeatRequest,
    HeartbeatAck,
    Dispatch {
        sequence: Option<u64>,
        event: DispatchEvent,
    },
    Reconnect,
    InvalidSession { resumable: bool },
    /// Op code this client does not handle
    Unknown { op: u8 },
}

impl GatewayPayload {
    /// Decode an inbound envelope
    ///
    /// Fails when the body of a known op code has the wrong shape.
    pub fn decode(message: &GatewayMessage) -> Result<Self, serde_json::Error> {
        let Some(op) = message.opcode() else {
            return Ok(Self::Unknown { op: message.op });
        };

        let payload = match op {
            OpCode::Hello => Self::Hello(serde_json::from_value(message.d.clone())?),
            OpCode::Heartbeat => Self::HeartbeatRequest,
            OpCode::HeartbeatAck => Self::HeartbeatAck,
            OpCode::Reconnect => Self::Reconnect,
            OpCode::InvalidSession => Self::InvalidSession {
                resumable: message.d.as_bool().unwrap_or(false),
            },
            OpCode::Dispatch => Self::Dispatch {
                sequence: message.s,
                event: decode_dispatch(message)?,
            },
            // Client-only op codes never arrive from the server
            OpCode::Identify
            | OpCode::PresenceUpdate
            | OpCode::VoiceStateUpdate
            | OpCode::Resume
            | OpCode::RequestGuildMembers => Self::Unknown { op: message.op },
        };

        Ok(payload)
    }
}

fn decode_dispatch(message: &GatewayMessage) -> Result<DispatchEvent, serde_json::Error> {
    let name = message.t.as_deref().unwrap_or_default();
    let event = match name {
        READY => DispatchEvent::Ready(serde_json::from_value(message.d.clone())?),
        RESUMED => DispatchEvent::Resumed,
        _ => DispatchEvent::Other {
            name: name.to_string(),
            data: message.d.clone(),
        },
    };
    Ok(event)
}
