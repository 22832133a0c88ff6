//! Shared types for emotrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an emote definition came from.
///
/// `Twitch` tags emotes the chat transport already identified in a message;
/// the other variants tag catalog entries by the provider that supplied them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EmoteSource {
    Twitch,
    Ffz,
    Bttv,
    #[serde(rename = "7tv")]
    SevenTv,
}

impl std::fmt::Display for EmoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Twitch => write!(f, "twitch"),
            Self::Ffz => write!(f, "ffz"),
            Self::Bttv => write!(f, "bttv"),
            Self::SevenTv => write!(f, "7tv"),
        }
    }
}

/// One catalog entry: the literal chat token and the provider it came from.
/// Immutable once fetched from a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Emote {
    pub name: String,
    pub source: EmoteSource,
}

impl Emote {
    pub fn new(name: impl Into<String>, source: EmoteSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// Inbound chat message as delivered by a channel's streaming session.
///
/// `emotes` holds one entry per emote occurrence the transport already
/// identified, expanded from the wire format's range list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub channel: String,
    pub text: String,
    pub emotes: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// One observed emote occurrence in a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageEvent {
    pub emote: String,
    pub channel: String,
    pub source: EmoteSource,
    pub timestamp: DateTime<Utc>,
}

impl UsageEvent {
    /// Event time as epoch milliseconds, the unit the usage store keys on.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}
