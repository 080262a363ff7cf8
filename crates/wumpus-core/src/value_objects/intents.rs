//! Gateway intent bitflags
//!
//! Intents select which event categories a shard receives. They are sent as a
//! plain integer bitmask in the Identify payload.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Gateway intent flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        /// Guild create/update/delete, roles, channels, threads
        const GUILDS                        = 1 << 0;
        /// Member add/update/remove (privileged)
        const GUILD_MEMBERS                 = 1 << 1;
        /// Audit log entries, bans
        const GUILD_MODERATION              = 1 << 2;
        /// Emoji, sticker and soundboard updates
        const GUILD_EXPRESSIONS             = 1 << 3;
        const GUILD_INTEGRATIONS            = 1 << 4;
        const GUILD_WEBHOOKS                = 1 << 5;
        const GUILD_INVITES                 = 1 << 6;
        const GUILD_VOICE_STATES            = 1 << 7;
        /// Presence updates (privileged)
        const GUILD_PRESENCES               = 1 << 8;
        const GUILD_MESSAGES                = 1 << 9;
        const GUILD_MESSAGE_REACTIONS       = 1 << 10;
        const GUILD_MESSAGE_TYPING          = 1 << 11;
        const DIRECT_MESSAGES               = 1 << 12;
        const DIRECT_MESSAGE_REACTIONS      = 1 << 13;
        const DIRECT_MESSAGE_TYPING         = 1 << 14;
        /// Message content in message events (privileged)
        const MESSAGE_CONTENT               = 1 << 15;
        const GUILD_SCHEDULED_EVENTS        = 1 << 16;
        const AUTO_MODERATION_CONFIGURATION = 1 << 20;
        const AUTO_MODERATION_EXECUTION     = 1 << 21;
        const GUILD_MESSAGE_POLLS           = 1 << 24;
        const DIRECT_MESSAGE_POLLS          = 1 << 25;

        /// Intents that must be enabled in the developer portal
        const PRIVILEGED = Self::GUILD_MEMBERS.bits()
            | Self::GUILD_PRESENCES.bits()
            | Self::MESSAGE_CONTENT.bits();
    }
}

impl Intents {
    /// Merge a set of intents with bitwise OR
    ///
    /// An empty input yields an empty (zero) bitmask.
    pub fn combine<I>(intents: I) -> Self
    where
        I: IntoIterator<Item = Intents>,
    {
        intents.into_iter().fold(Intents::empty(), |acc, i| acc | i)
    }

    /// Check whether any privileged intent is requested
    #[inline]
    pub fn has_privileged(&self) -> bool {
        self.intersects(Intents::PRIVILEGED)
    }

    /// Parse from a decimal bitmask or a comma-separated list of flag names
    ///
    /// Names are matched case-insensitively, e.g. `"guilds, MESSAGE_CONTENT"`.
    pub fn parse(s: &str) -> Result<Self, IntentsParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Intents::empty());
        }

        if let Ok(bits) = trimmed.parse::<u64>() {
            return Ok(Intents::from_bits_truncate(bits));
        }

        trimmed
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                Intents::from_name(&name.to_ascii_uppercase())
                    .ok_or_else(|| IntentsParseError::UnknownFlag(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Intents::combine)
    }
}

impl Default for Intents {
    fn default() -> Self {
        Intents::empty()
    }
}

impl fmt::Display for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

// The gateway expects a plain integer
impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Intents::from_bits_truncate)
    }
}

impl From<u64> for Intents {
    fn from(bits: u64) -> Self {
        Intents::from_bits_truncate(bits)
    }
}

impl From<Intents> for u64 {
    fn from(intents: Intents) -> Self {
        intents.bits()
    }
}

/// Intent parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentsParseError {
    #[error("Unknown intent flag: {0}")]
    UnknownFlag(String),
}
