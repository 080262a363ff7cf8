//! Gateway protocol definitions
//!
//! Op codes, close codes and their recovery policy, the message envelope, and
//! the typed payloads carried inside it.

mod close_codes;
mod events;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::{CloseCode, CloseEvent, RecoverMethod};
pub use events::{DispatchEvent, GatewayPayload};
pub use messages::GatewayMessage;
pub use opcodes::{Direction, OpCode};
pub use payloads::{
    HelloPayload, IdentifyPayload, IdentifyProperties, ReadyPayload, ResumePayload,
};
