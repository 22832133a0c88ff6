//! Emote provider clients for emotrics
//!
//! One HTTP client covering the three third-party emote providers a channel's
//! catalog is aggregated from: FrankerFaceZ, BetterTTV, and 7TV. Each provider
//! fetch is independent and returns a fully materialized list; merging the
//! lists into a catalog is the caller's job.

pub mod bttv;
pub mod client;
pub mod ffz;
pub mod seventv;

// Re-export main types
pub use client::{EmoteClient, ProviderOptions};
