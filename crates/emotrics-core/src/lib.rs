//! emotrics-core - shared types for the emote usage tracker
//!
//! This crate provides:
//! - The `Emote` / `EmoteSource` catalog types
//! - The `ChatMessage` delivered by a chat session
//! - The `UsageEvent` emitted for every recognized emote occurrence
//! - The `UsageSink` trait the pipeline records events through

pub mod sink;
pub mod types;

// Re-export main types for convenience
pub use sink::{MemorySink, TracingSink, UsageSink};
pub use types::{ChatMessage, Emote, EmoteSource, UsageEvent};
