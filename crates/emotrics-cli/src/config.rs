use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use emotrics_chat::AggregatorOptions;
use emotrics_emotes::ProviderOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotricsConfig {
    pub twitch: TwitchConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TwitchConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub access_token: String,
}

impl std::fmt::Debug for TwitchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitchConfig")
            .field("client_id", &self.client_id)
            .field("access_token", &mask_secret(&self.access_token))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default = "default_channels_file")]
    pub file: String,
}

fn default_channels_file() -> String {
    "~/.emotrics/channels.txt".to_string()
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            file: default_channels_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub ffz: ProviderToggles,
    #[serde(default)]
    pub bttv: ProviderToggles,
    #[serde(default)]
    pub seventv: ProviderToggles,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProviderToggles {
    #[serde(default = "default_true")]
    pub include_global: bool,
    #[serde(default = "default_true")]
    pub include_channel: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProviderToggles {
    fn default() -> Self {
        Self {
            include_global: true,
            include_channel: true,
        }
    }
}

impl From<ProviderToggles> for ProviderOptions {
    fn from(toggles: ProviderToggles) -> Self {
        Self {
            include_global: toggles.include_global,
            include_channel: toggles.include_channel,
        }
    }
}

impl ProvidersConfig {
    pub fn aggregator_options(&self) -> AggregatorOptions {
        AggregatorOptions {
            ffz: self.ffz.into(),
            bttv: self.bttv.into(),
            seventv: self.seventv.into(),
        }
    }
}

/// Mask a secret string for safe display in Debug output / logs.
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".emotrics")
}

impl EmotricsConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        // The config may hold credentials; refuse group/other-readable files
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(&path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `emotrics init` first.",
                path.display()
            )
        })?;

        let expanded = expand_env_vars(&content);

        let config: Self = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        if config.twitch.client_id.is_empty() || config.twitch.access_token.is_empty() {
            warn!(
                "Twitch credentials are not configured — channel id resolution will fail. \
                 Set TWITCH_CLIENT_ID and TWITCH_ACCESS_TOKEN."
            );
        }

        Ok(config)
    }
}

/// Allowlist of environment variable names that may be expanded in config
/// files. This prevents an attacker who can modify the config from reading
/// arbitrary env vars.
const ALLOWED_ENV_VARS: &[&str] = &["TWITCH_CLIENT_ID", "TWITCH_ACCESS_TOKEN", "HOME", "USER"];

pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        if let Some(start) = result[pos..].find("${") {
            let abs_start = pos + start;
            if let Some(end) = result[abs_start..].find('}') {
                let var_name = result[abs_start + 2..abs_start + end].to_string();

                let value = if ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
                    std::env::var(&var_name).unwrap_or_default()
                } else {
                    warn!(
                        "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                        var_name
                    );
                    // Leave the ${VAR} unexpanded so it's obvious
                    pos = abs_start + end + 1;
                    continue;
                };

                let value_len = value.len();
                result = format!(
                    "{}{}{}",
                    &result[..abs_start],
                    value,
                    &result[abs_start + end + 1..]
                );
                pos = abs_start + value_len; // Skip past the expanded value
            } else {
                break;
            }
        } else {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [twitch]
            client_id = "abc"
            access_token = "xyz"

            [channels]
            file = "/tmp/channels.txt"

            [providers.ffz]
            include_global = false
            include_channel = true

            [providers.bttv]
            include_global = true
            include_channel = false
        "#;

        let config: EmotricsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.twitch.client_id, "abc");
        assert_eq!(config.channels.file, "/tmp/channels.txt");

        let options = config.providers.aggregator_options();
        assert!(!options.ffz.include_global);
        assert!(options.ffz.include_channel);
        assert!(options.bttv.include_global);
        assert!(!options.bttv.include_channel);
        // Unspecified provider falls back to both toggles on
        assert!(options.seventv.include_global);
        assert!(options.seventv.include_channel);
    }

    #[test]
    fn test_parse_minimal_config_defaults() {
        let config: EmotricsConfig = toml::from_str("[twitch]\n").unwrap();
        assert!(config.twitch.client_id.is_empty());
        assert_eq!(config.channels.file, "~/.emotrics/channels.txt");
        let options = config.providers.aggregator_options();
        assert!(options.ffz.include_global && options.ffz.include_channel);
    }

    #[test]
    fn test_bundled_default_config_parses() {
        let raw = include_str!("../../../config/default.toml");
        let expanded = expand_env_vars(raw);
        let config: EmotricsConfig = toml::from_str(&expanded).unwrap();
        assert_eq!(config.channels.file, "~/.emotrics/channels.txt");
    }

    #[test]
    fn test_expand_env_vars_allowlist() {
        // Allowlisted vars expand (to their value, or empty when unset)
        let expanded = expand_env_vars("id = \"${TWITCH_CLIENT_ID}\"");
        assert!(!expanded.contains("${"));

        // Unlisted vars are left in place
        let expanded = expand_env_vars("secret = \"${SOME_RANDOM_SECRET}\"");
        assert!(expanded.contains("${SOME_RANDOM_SECRET}"));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("supersecrettoken"), "sup...oken");
    }
}
