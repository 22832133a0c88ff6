//! HTTP client for the emote providers

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use emotrics_core::Emote;

use crate::{bttv, ffz, seventv};

const FFZ_BASE: &str = "https://api.frankerfacez.com";
const BTTV_BASE: &str = "https://api.betterttv.net";
const SEVENTV_BASE: &str = "https://7tv.io";

/// Transient provider failures are retried this many times before giving up.
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// The two provider-defined toggles every provider call takes, passed through
/// unchanged: whether to include the provider's global emote set and whether
/// to include the channel-specific set.
#[derive(Debug, Clone, Copy)]
pub struct ProviderOptions {
    pub include_global: bool,
    pub include_channel: bool,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            include_global: true,
            include_channel: true,
        }
    }
}

/// Client for the three emote providers.
///
/// Base URLs are overridable so tests can point at a local server.
#[derive(Clone)]
pub struct EmoteClient {
    client: reqwest::Client,
    ffz_base: String,
    bttv_base: String,
    seventv_base: String,
}

impl std::fmt::Debug for EmoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmoteClient")
            .field("client", &"<reqwest::Client>")
            .field("ffz_base", &self.ffz_base)
            .field("bttv_base", &self.bttv_base)
            .field("seventv_base", &self.seventv_base)
            .finish()
    }
}

impl Default for EmoteClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EmoteClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            ffz_base: FFZ_BASE.to_string(),
            bttv_base: BTTV_BASE.to_string(),
            seventv_base: SEVENTV_BASE.to_string(),
        }
    }

    pub fn with_ffz_base(mut self, base: String) -> Self {
        self.ffz_base = base;
        self
    }

    pub fn with_bttv_base(mut self, base: String) -> Self {
        self.bttv_base = base;
        self
    }

    pub fn with_seventv_base(mut self, base: String) -> Self {
        self.seventv_base = base;
        self
    }

    /// Fetch a channel's FrankerFaceZ emotes.
    pub async fn ffz_emotes(&self, channel_id: &str, opts: ProviderOptions) -> Result<Vec<Emote>> {
        let mut emotes = Vec::new();
        if opts.include_global {
            let url = format!("{}/v1/set/global", self.ffz_base);
            if let Some(resp) = self.get_json::<ffz::FfzSetsResponse>(&url).await? {
                emotes.extend(ffz::collect(resp));
            }
        }
        if opts.include_channel {
            let url = format!("{}/v1/room/id/{}", self.ffz_base, channel_id);
            if let Some(resp) = self.get_json::<ffz::FfzSetsResponse>(&url).await? {
                emotes.extend(ffz::collect(resp));
            }
        }
        debug!(channel_id, count = emotes.len(), "fetched FrankerFaceZ emotes");
        Ok(emotes)
    }

    /// Fetch a channel's BetterTTV emotes. The channel set spans both the
    /// channel's own uploads and its shared emotes.
    pub async fn bttv_emotes(&self, channel_id: &str, opts: ProviderOptions) -> Result<Vec<Emote>> {
        let mut emotes = Vec::new();
        if opts.include_global {
            let url = format!("{}/3/cached/emotes/global", self.bttv_base);
            if let Some(resp) = self.get_json::<Vec<bttv::BttvEmote>>(&url).await? {
                emotes.extend(bttv::collect_global(resp));
            }
        }
        if opts.include_channel {
            let url = format!("{}/3/cached/users/twitch/{}", self.bttv_base, channel_id);
            if let Some(resp) = self.get_json::<bttv::BttvUserResponse>(&url).await? {
                emotes.extend(bttv::collect_user(resp));
            }
        }
        debug!(channel_id, count = emotes.len(), "fetched BetterTTV emotes");
        Ok(emotes)
    }

    /// Fetch a channel's 7TV emotes.
    pub async fn seventv_emotes(
        &self,
        channel_id: &str,
        opts: ProviderOptions,
    ) -> Result<Vec<Emote>> {
        let mut emotes = Vec::new();
        if opts.include_global {
            let url = format!("{}/v3/emote-sets/global", self.seventv_base);
            if let Some(resp) = self.get_json::<seventv::SevenTvEmoteSet>(&url).await? {
                emotes.extend(seventv::collect_set(resp));
            }
        }
        if opts.include_channel {
            let url = format!("{}/v3/users/twitch/{}", self.seventv_base, channel_id);
            if let Some(resp) = self.get_json::<seventv::SevenTvUserResponse>(&url).await? {
                emotes.extend(seventv::collect_user(resp));
            }
        }
        debug!(channel_id, count = emotes.len(), "fetched 7TV emotes");
        Ok(emotes)
    }

    /// GET a JSON document with bounded retry on transient failures.
    ///
    /// Returns `Ok(None)` on 404: providers answer that way for channels they
    /// have no emotes for, which is an empty catalog contribution, not a fault.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 1..=MAX_ATTEMPTS {
            let err = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_FOUND {
                        debug!(url, "provider has no data for this channel");
                        return Ok(None);
                    }
                    if status.is_success() {
                        let body = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("Failed to decode response from {url}"))?;
                        return Ok(Some(body));
                    }
                    if !status.is_server_error() {
                        return Err(anyhow!("provider request to {url} failed: {status}"));
                    }
                    anyhow!("provider request to {url} failed: {status}")
                }
                Err(e) => anyhow!(e).context(format!("provider request to {url} failed")),
            };

            if attempt == MAX_ATTEMPTS {
                return Err(err);
            }
            warn!(url, attempt, "provider request failed, retrying in {backoff:?}: {err:#}");
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        unreachable!("retry loop returns on the final attempt")
    }
}
