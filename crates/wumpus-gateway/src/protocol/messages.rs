//! Gateway message format
//!
//! Every frame on the wire is a JSON object `{op, d, s, t}`.

use super::{IdentifyPayload, OpCode, ResumePayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message envelope
///
/// `op` is kept as a raw integer so that op codes this client does not know
/// still decode and can be reported instead of failing the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: u8,

    /// Payload; shape depends on `op`
    #[serde(default)]
    pub d: Value,

    /// Sequence number (dispatch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event name (dispatch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayMessage {
    fn outbound(op: OpCode, d: Value) -> Self {
        Self {
            op: op.as_u8(),
            d,
            s: None,
            t: None,
        }
    }

    /// Create a Heartbeat message (op=1)
    ///
    /// `d` is the last sequence number seen, or null before the first dispatch.
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::outbound(
            OpCode::Heartbeat,
            last_sequence.map_or(Value::Null, |s| Value::Number(s.into())),
        )
    }

    /// Create an Identify message (op=2)
    pub fn identify(payload: &IdentifyPayload) -> Result<Self, serde_json::Error> {
        Ok(Self::outbound(OpCode::Identify, serde_json::to_value(payload)?))
    }

    /// Create a Resume message (op=6)
    pub fn resume(payload: &ResumePayload) -> Result<Self, serde_json::Error> {
        Ok(Self::outbound(OpCode::Resume, serde_json::to_value(payload)?))
    }

    /// Known op code of this message, if any
    #[must_use]
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.op)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.opcode() {
            Some(op) => write!(f, "GatewayMessage(op={op}")?,
            None => write!(f, "GatewayMessage(op={}", self.op)?,
        }
        if let Some(t) = &self.t {
            write!(f, ", t={t}")?;
        }
        if let Some(s) = self.s {
            write!(f, ", s={s}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wumpus_core::{Intents, ShardInfo};

    #[test]
    fn test_heartbeat_before_first_dispatch() {
        let json = GatewayMessage::heartbeat(None).to_json().unwrap();
        assert_eq!(json, r#"{"op":1,"d":null}"#);
    }

    #[test]
    fn test_heartbeat_with_sequence() {
        let json = GatewayMessage::heartbeat(Some(42)).to_json().unwrap();
        assert_eq!(json, r#"{"op":1,"d":42}"#);
    }

    #[test]
    fn test_identify_message() {
        let payload = IdentifyPayload::new("tok", Intents::GUILDS, true, ShardInfo::new(0, 1));
        let msg = GatewayMessage::identify(&payload).unwrap();

        assert_eq!(msg.opcode(), Some(OpCode::Identify));
        assert_eq!(msg.d["intents"], 1);
        assert_eq!(msg.d["compress"], true);
        assert_eq!(msg.d["shard"], json!([0, 1]));
    }

    #[test]
    fn test_resume_message() {
        let payload = ResumePayload {
            token: "tok".to_string(),
            session_id: "sess".to_string(),
            seq: Some(7),
        };
        let value: Value = serde_json::from_str(&GatewayMessage::resume(&payload).unwrap().to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"op": 6, "d": {"token": "tok", "session_id": "sess", "seq": 7}})
        );
    }

    #[test]
    fn test_parse_dispatch() {
        let msg = GatewayMessage::from_json(
            r#"{"op":0,"d":{"content":"hi"},"s":5,"t":"MESSAGE_CREATE"}"#,
        )
        .unwrap();

        assert_eq!(msg.opcode(), Some(OpCode::Dispatch));
        assert_eq!(msg.s, Some(5));
        assert_eq!(msg.t.as_deref(), Some("MESSAGE_CREATE"));
        assert_eq!(msg.d["content"], "hi");
    }

    #[test]
    fn test_parse_with_explicit_nulls() {
        let msg = GatewayMessage::from_json(r#"{"op":11,"d":null,"s":null,"t":null}"#).unwrap();
        assert_eq!(msg.opcode(), Some(OpCode::HeartbeatAck));
        assert!(msg.s.is_none());
        assert!(msg.t.is_none());
    }

    #[test]
    fn test_parse_unknown_op() {
        let msg = GatewayMessage::from_json(r#"{"op":42,"d":{}}"#).unwrap();
        assert_eq!(msg.op, 42);
        assert!(msg.opcode().is_none());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(GatewayMessage::from_json("not json").is_err());
        assert!(GatewayMessage::from_json(r#"{"d":{}}"#).is_err());
    }

    #[test]
    fn test_display() {
        let msg = GatewayMessage {
            op: 0,
            d: Value::Null,
            s: Some(3),
            t: Some("READY".to_string()),
        };
        assert_eq!(msg.to_string(), "GatewayMessage(op=Dispatch (0), t=READY, s=3)");
    }
}
