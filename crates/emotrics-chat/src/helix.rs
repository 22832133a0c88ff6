//! Twitch Helix user lookup

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const HELIX_BASE: &str = "https://api.twitch.tv";

/// Minimal Helix client covering the one call the bot lifecycle needs:
/// resolving a channel login to its numeric id. Constructed once at startup
/// and passed down explicitly.
#[derive(Clone)]
pub struct HelixClient {
    client: reqwest::Client,
    client_id: String,
    token: String,
    base_url: String,
}

impl std::fmt::Debug for HelixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelixClient")
            .field("client", &"<reqwest::Client>")
            .field("client_id", &self.client_id)
            .field("token", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    data: Vec<HelixUser>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    id: String,
    login: String,
}

impl HelixClient {
    pub fn new(client_id: String, token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            client_id,
            token,
            base_url: HELIX_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Resolve a channel login to its numeric id, the key the emote provider
    /// APIs expect. Fails if the channel does not exist.
    pub async fn resolve_channel_id(&self, login: &str) -> Result<String> {
        let url = format!("{}/helix/users", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("login", login)])
            .header("Client-Id", &self.client_id)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to send request to Helix API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Helix user lookup failed with status {status}: {error_text}"));
        }

        let users: UsersResponse = response
            .json()
            .await
            .context("Failed to parse Helix users response")?;

        let user = users
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("channel '{login}' does not exist"))?;

        debug!(login = %user.login, id = %user.id, "resolved channel id");
        Ok(user.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_users_response() {
        let json = r#"{
            "data": [
                {
                    "id": "141981764",
                    "login": "twitchdev",
                    "display_name": "TwitchDev",
                    "type": "",
                    "broadcaster_type": "partner"
                }
            ]
        }"#;

        let users: UsersResponse = serde_json::from_str(json).unwrap();
        assert_eq!(users.data.len(), 1);
        assert_eq!(users.data[0].id, "141981764");
        assert_eq!(users.data[0].login, "twitchdev");
    }

    #[test]
    fn test_parse_empty_users_response() {
        let users: UsersResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(users.data.is_empty());
    }
}
