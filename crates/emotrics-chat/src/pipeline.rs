//! Per-message tokenization and catalog lookup

use emotrics_core::{ChatMessage, EmoteSource, UsageEvent, UsageSink};

use crate::bot::BotRegistry;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Every message's channel should have been registered during seeding, so
    /// a miss is a fault to surface, not a silent no-op.
    #[error("no bot registered for channel '{0}'")]
    UnknownChannel(String),
}

/// Process one inbound chat message, recording one usage event per recognized
/// emote occurrence. Returns the number of events emitted.
///
/// Emotes the transport already identified are recorded first, tagged with the
/// platform's own source and without touching the catalog. The text is then
/// split on whitespace and every token found in the owning bot's catalog is
/// recorded with the name and source tag stored at population time. Duplicate
/// tokens each emit their own event; unknown tokens are ignored.
pub async fn process(
    message: &ChatMessage,
    registry: &BotRegistry,
    sink: &dyn UsageSink,
) -> Result<usize, PipelineError> {
    let mut emitted = 0;

    for name in &message.emotes {
        sink.record(UsageEvent {
            emote: name.clone(),
            channel: message.channel.clone(),
            source: EmoteSource::Twitch,
            timestamp: message.timestamp,
        })
        .await;
        emitted += 1;
    }

    let bot = registry
        .get(&message.channel)
        .ok_or_else(|| PipelineError::UnknownChannel(message.channel.clone()))?;

    for token in message.text.split_whitespace() {
        if let Some(emote) = bot.resolve_emote(token) {
            sink.record(UsageEvent {
                emote: emote.name,
                channel: message.channel.clone(),
                source: emote.source,
                timestamp: message.timestamp,
            })
            .await;
            emitted += 1;
        }
    }

    Ok(emitted)
}
