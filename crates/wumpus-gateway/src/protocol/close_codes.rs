//! WebSocket close codes and recovery policy
//!
//! Every well-known close code maps to exactly one [`RecoverMethod`]. Codes
//! that signal a configuration problem are fatal: the shard stops and the
//! error is surfaced instead of being recovered from.

use serde::{Deserialize, Serialize};

/// How a shard recovers after its connection closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecoverMethod {
    /// Reconnect to the resume URL and replay missed events
    Resume,
    /// Open a brand-new session
    Reconnect,
    /// Stay disconnected
    Disconnect,
}

impl RecoverMethod {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::Disconnect => "Disconnect",
        }
    }
}

impl std::fmt::Display for RecoverMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Well-known close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// The session is gone
    Normal = 1000,
    /// Server restart or load balancing
    GoingAway = 1001,
    /// Connection dropped without a close frame
    Abnormal = 1006,
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    /// A payload arrived before Identify
    NotAuthenticated = 4003,
    /// Bad token
    AuthenticationFailed = 4004,
    /// Identify sent twice
    AlreadyAuthenticated = 4005,
    /// Resume carried a bad sequence
    InvalidSequence = 4007,
    RateLimited = 4008,
    SessionTimedOut = 4009,
    InvalidShard = 4010,
    /// Too many guilds for one shard
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    /// Privileged intent not enabled for the application
    DisallowedIntents = 4014,
    /// Sent by this client before a resume
    Resuming = 4200,
    /// Sent by this client after too many missed heartbeat ACKs
    ZombieConnection = 4201,
    /// Sent by this client to end the session
    Close = 4202,
}

impl CloseCode {
    /// Every well-known code, in wire order
    pub const ALL: [CloseCode; 20] = [
        Self::Normal,
        Self::GoingAway,
        Self::Abnormal,
        Self::UnknownError,
        Self::UnknownOpcode,
        Self::DecodeError,
        Self::NotAuthenticated,
        Self::AuthenticationFailed,
        Self::AlreadyAuthenticated,
        Self::InvalidSequence,
        Self::RateLimited,
        Self::SessionTimedOut,
        Self::InvalidShard,
        Self::ShardingRequired,
        Self::InvalidApiVersion,
        Self::InvalidIntents,
        Self::DisallowedIntents,
        Self::Resuming,
        Self::ZombieConnection,
        Self::Close,
    ];

    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_u16() == value)
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Recovery policy for this close code
    #[must_use]
    pub const fn recover_method(self) -> RecoverMethod {
        if self.is_fatal() {
            return RecoverMethod::Disconnect;
        }
        match self {
            Self::Normal | Self::NotAuthenticated | Self::InvalidSequence | Self::SessionTimedOut => {
                RecoverMethod::Reconnect
            }
            Self::Close => RecoverMethod::Disconnect,
            _ => RecoverMethod::Resume,
        }
    }

    /// Check if the close signals a configuration problem the caller must fix
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self.as_u16(), 4004 | 4010..=4014)
    }

    /// Human-readable reason, also used as the close frame reason
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Normal => "Normal closure",
            Self::GoingAway => "Gateway going away",
            Self::Abnormal => "Connection lost",
            Self::UnknownError => "Unknown gateway error",
            Self::UnknownOpcode => "Unknown op code sent",
            Self::DecodeError => "Undecodable payload sent",
            Self::NotAuthenticated => "Payload sent before identifying",
            Self::AuthenticationFailed => "Token rejected",
            Self::AlreadyAuthenticated => "Identified twice",
            Self::InvalidSequence => "Resume sequence rejected",
            Self::RateLimited => "Sending too fast",
            Self::SessionTimedOut => "Session timed out",
            Self::InvalidShard => "Shard pair rejected",
            Self::ShardingRequired => "More shards required",
            Self::InvalidApiVersion => "Gateway version rejected",
            Self::InvalidIntents => "Invalid intents",
            Self::DisallowedIntents => "Disallowed intents",
            Self::Resuming => "Closing to resume",
            Self::ZombieConnection => "Heartbeat ACKs missed",
            Self::Close => "Closed by client",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?}: {}", self.as_u16(), self, self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

/// A close code paired with its resolved recovery method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CloseEvent {
    pub code: u16,
    pub recover: RecoverMethod,
}

impl CloseEvent {
    /// Resolve a raw close code against the policy table
    ///
    /// Unmapped codes default to [`RecoverMethod::Disconnect`] without being fatal.
    #[must_use]
    pub fn resolve(code: u16) -> Self {
        CloseCode::from_u16(code).map_or(
            Self {
                code,
                recover: RecoverMethod::Disconnect,
            },
            Self::from,
        )
    }

    /// The known close code, if any
    #[must_use]
    pub fn known(&self) -> Option<CloseCode> {
        CloseCode::from_u16(self.code)
    }

    /// Check if this close must be raised as a protocol error
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.known().is_some_and(CloseCode::is_fatal)
    }

    /// Deliberate, non-fatal shutdown
    #[must_use]
    pub fn close() -> Self {
        Self::from(CloseCode::Close)
    }
}

impl From<CloseCode> for CloseEvent {
    fn from(code: CloseCode) -> Self {
        Self {
            code: code.as_u16(),
            recover: code.recover_method(),
        }
    }
}

impl std::fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.code, self.recover)
    }
}
