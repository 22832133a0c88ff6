//! Chat connections and the message pipeline for emotrics
//!
//! This crate provides:
//! - Channel id resolution against the Twitch Helix API
//! - An anonymous read-only Twitch chat session over IRC-on-websocket
//! - The per-channel `Bot` connection and the concurrency-safe `BotRegistry`
//! - The message pipeline turning chat lines into emote usage events

pub mod bot;
pub mod helix;
pub mod irc;
pub mod pipeline;
pub mod session;

// Re-export main types
pub use bot::{AggregatorOptions, Bot, BotRegistry, ChatContext, launch};
pub use helix::HelixClient;
pub use pipeline::{PipelineError, process};
pub use session::ChatSession;
