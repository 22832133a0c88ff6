//! Channel connections, the bot registry, and lifecycle supervision

use anyhow::{Context, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use emotrics_core::{Emote, UsageSink};
use emotrics_emotes::{EmoteClient, ProviderOptions};

use crate::helix::HelixClient;
use crate::pipeline;
use crate::session::ChatSession;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// One live chat connection: the channel's identity and its emote catalog.
///
/// The catalog is written by the channel's own population task and read by its
/// own message loop; a message arriving mid-population sees whatever has been
/// merged so far.
pub struct Bot {
    pub name: String,
    pub id: String,
    catalog: DashMap<String, Emote>,
}

impl Bot {
    pub fn new(name: &str, id: &str) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            catalog: DashMap::new(),
        }
    }

    /// Look a token up in the catalog.
    pub fn resolve_emote(&self, token: &str) -> Option<Emote> {
        self.catalog.get(token).map(|entry| entry.value().clone())
    }

    /// Fold one provider's emote list into the catalog, keyed by the literal
    /// chat token. Last writer wins on cross-provider collisions.
    pub fn merge_emotes(&self, emotes: Vec<Emote>) {
        for emote in emotes {
            self.catalog.insert(emote.name.clone(), emote);
        }
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("catalog_len", &self.catalog.len())
            .finish()
    }
}

/// All active channel connections, keyed by channel name. Inserted into
/// during startup seeding and read concurrently by every channel's message
/// loop; seeding overlaps with already-running loops, so lookups and inserts
/// must be safe together.
#[derive(Debug, Default)]
pub struct BotRegistry {
    bots: DashMap<String, Arc<Bot>>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bot: Arc<Bot>) {
        self.bots.insert(bot.name.clone(), bot);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Bot>> {
        self.bots.get(name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

/// Per-provider toggles handed through to each provider call unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatorOptions {
    pub ffz: ProviderOptions,
    pub bttv: ProviderOptions,
    pub seventv: ProviderOptions,
}

/// Everything a channel lifecycle needs, constructed once at startup and
/// passed down explicitly.
pub struct ChatContext {
    pub helix: HelixClient,
    pub emotes: EmoteClient,
    pub options: AggregatorOptions,
    pub registry: Arc<BotRegistry>,
    pub sink: Arc<dyn UsageSink>,
    pub cancel: CancellationToken,
    pub tracker: TaskTracker,
}

/// Begin the lifecycle for one channel: resolve its id, register the
/// connection, then concurrently populate the emote catalog and run the chat
/// read loop. There is no barrier between the two tasks; messages processed
/// before population completes simply miss the catalog.
///
/// Errors here affect only this channel — the caller decides whether to keep
/// seeding others.
pub async fn launch(ctx: &ChatContext, channel: &str) -> Result<Arc<Bot>> {
    let id = ctx
        .helix
        .resolve_channel_id(channel)
        .await
        .with_context(|| format!("failed to resolve channel id for '{channel}'"))?;

    let bot = Arc::new(Bot::new(channel, &id));
    // Registered before either task starts so pipeline lookups never miss a
    // launched channel.
    ctx.registry.insert(bot.clone());
    info!(channel, id = %bot.id, "channel connection created");

    {
        let bot = bot.clone();
        let client = ctx.emotes.clone();
        let options = ctx.options;
        ctx.tracker.spawn(async move {
            populate_catalog(&bot, &client, options).await;
        });
    }

    {
        let bot = bot.clone();
        let registry = ctx.registry.clone();
        let sink = ctx.sink.clone();
        let cancel = ctx.cancel.clone();
        ctx.tracker.spawn(async move {
            read_loop(bot, registry, sink, cancel).await;
        });
    }

    Ok(bot)
}

/// Fetch all three providers concurrently, then merge in a fixed order so
/// cross-provider name collisions resolve deterministically. A failed
/// provider degrades coverage; the others still merge.
async fn populate_catalog(bot: &Bot, client: &EmoteClient, options: AggregatorOptions) {
    let (ffz, bttv, seventv) = tokio::join!(
        client.ffz_emotes(&bot.id, options.ffz),
        client.bttv_emotes(&bot.id, options.bttv),
        client.seventv_emotes(&bot.id, options.seventv),
    );

    for (provider, result) in [("ffz", ffz), ("bttv", bttv), ("7tv", seventv)] {
        match result {
            Ok(emotes) => {
                let count = emotes.len();
                bot.merge_emotes(emotes);
                debug!(channel = %bot.name, provider, count, "merged provider emotes");
            }
            Err(e) => {
                warn!(channel = %bot.name, provider, "emote provider failed: {e:#}");
            }
        }
    }

    info!(channel = %bot.name, total = bot.catalog_len(), "emote catalog populated");
}

/// Run the channel's chat session for the process lifetime, reconnecting with
/// capped exponential backoff. Messages on this channel are processed in
/// arrival order; a failure here never touches sibling channels.
async fn read_loop(
    bot: Arc<Bot>,
    registry: Arc<BotRegistry>,
    sink: Arc<dyn UsageSink>,
    cancel: CancellationToken,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match ChatSession::connect(&bot.name).await {
            Ok(mut session) => {
                backoff = INITIAL_BACKOFF;
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!(channel = %bot.name, "read loop cancelled");
                            return;
                        }
                        next = session.next_message() => match next {
                            Ok(Some(message)) => {
                                if let Err(e) = pipeline::process(&message, &registry, sink.as_ref()).await {
                                    error!(channel = %bot.name, "message dropped: {e}");
                                }
                            }
                            Ok(None) => {
                                warn!(channel = %bot.name, "chat stream closed");
                                break;
                            }
                            Err(e) => {
                                error!(channel = %bot.name, "chat session error: {e:#}");
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!(channel = %bot.name, "failed to connect chat session: {e:#}");
            }
        }

        warn!(channel = %bot.name, "reconnecting in {backoff:?}");
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotrics_core::EmoteSource;

    #[test]
    fn test_registry_lookup_after_insert() {
        let registry = BotRegistry::new();
        assert!(registry.is_empty());

        let bot = Arc::new(Bot::new("foo", "42"));
        registry.insert(bot.clone());

        assert_eq!(registry.len(), 1);
        let found = registry.get("foo").unwrap();
        assert_eq!(found.name, "foo");
        assert_eq!(found.id, "42");
    }

    #[test]
    fn test_registry_miss_is_none() {
        let registry = BotRegistry::new();
        registry.insert(Arc::new(Bot::new("foo", "42")));
        assert!(registry.get("bar").is_none());
    }

    #[test]
    fn test_registry_one_connection_per_name() {
        let registry = BotRegistry::new();
        registry.insert(Arc::new(Bot::new("foo", "42")));
        registry.insert(Arc::new(Bot::new("foo", "43")));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("foo").unwrap().id, "43");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let bot = Bot::new("foo", "42");
        let list = vec![
            Emote::new("PogU", EmoteSource::Ffz),
            Emote::new("CatBag", EmoteSource::Ffz),
        ];

        bot.merge_emotes(list.clone());
        bot.merge_emotes(list);

        assert_eq!(bot.catalog_len(), 2);
        assert_eq!(
            bot.resolve_emote("PogU"),
            Some(Emote::new("PogU", EmoteSource::Ffz))
        );
    }

    #[test]
    fn test_merge_last_writer_wins() {
        let bot = Bot::new("foo", "42");

        // Fixed merge order: a later provider overwrites an earlier one
        bot.merge_emotes(vec![Emote::new("Pog", EmoteSource::Ffz)]);
        bot.merge_emotes(vec![Emote::new("Pog", EmoteSource::Bttv)]);

        assert_eq!(bot.catalog_len(), 1);
        assert_eq!(
            bot.resolve_emote("Pog"),
            Some(Emote::new("Pog", EmoteSource::Bttv))
        );
    }

    #[test]
    fn test_resolve_unknown_token() {
        let bot = Bot::new("foo", "42");
        bot.merge_emotes(vec![Emote::new("PogU", EmoteSource::SevenTv)]);
        assert!(bot.resolve_emote("hello").is_none());
    }
}
