use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::EmotricsConfig;
use emotrics_chat::{BotRegistry, ChatContext, HelixClient, launch};
use emotrics_core::{TracingSink, UsageSink};
use emotrics_emotes::EmoteClient;

#[derive(Parser)]
#[command(name = "emotrics")]
#[command(version)]
#[command(about = "emotrics — Twitch chat emote usage tracker")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the configured channels and start recording emote usage
    Start {
        /// Channel list file (one channel login per line); overrides the config
        #[arg(long)]
        channels: Option<PathBuf>,
    },

    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Start { channels } => cmd_start(&cli.config, channels).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        info!("Created default config at {}", config_path.display());
    }

    let channels_path = config_dir.join("channels.txt");
    if !channels_path.exists() {
        tokio::fs::write(
            &channels_path,
            "# One Twitch channel login per line.\n",
        )
        .await?;
        info!("Created channel list at {}", channels_path.display());
    }

    println!("emotrics initialized at {}", config_dir.display());
    println!(
        "Edit {} to configure credentials, then add channels to {}.",
        config_path.display(),
        channels_path.display()
    );
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = EmotricsConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}

async fn cmd_start(config_path: &Option<PathBuf>, channels_override: Option<PathBuf>) -> Result<()> {
    let cfg = EmotricsConfig::load(config_path)?;
    info!("Starting emotrics...");

    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();

    let sink: Arc<dyn UsageSink> = Arc::new(TracingSink::new());
    let ctx = ChatContext {
        helix: HelixClient::new(cfg.twitch.client_id.clone(), cfg.twitch.access_token.clone()),
        emotes: EmoteClient::new(),
        options: cfg.providers.aggregator_options(),
        registry: Arc::new(BotRegistry::new()),
        sink,
        cancel: cancel.clone(),
        tracker: tracker.clone(),
    };

    // Seed the registry from the channel list, one lifecycle per line. A
    // channel that fails setup is reported and skipped; the rest keep going.
    let channels_path = channels_override.unwrap_or_else(|| shellexpand(&cfg.channels.file));
    let list = tokio::fs::read_to_string(&channels_path)
        .await
        .with_context(|| format!("Failed to read channel list at {}", channels_path.display()))?;

    let mut launched = 0;
    for line in list.lines() {
        let channel = line.trim();
        if channel.is_empty() || channel.starts_with('#') {
            continue;
        }
        match launch(&ctx, channel).await {
            Ok(bot) => {
                launched += 1;
                info!(channel = %bot.name, id = %bot.id, "channel connection launched");
            }
            Err(e) => error!("failed to start channel '{channel}': {e:#}"),
        }
    }

    if launched == 0 {
        bail!(
            "no channels could be started from {}",
            channels_path.display()
        );
    }
    info!(launched, "channel seeding complete");
    println!("emotrics is running. Press Ctrl+C to stop.");

    // Wait for shutdown signal, then cancel every channel task and drain
    signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    cancel.cancel();
    tracker.close();
    tracker.wait().await;

    println!("emotrics stopped.");
    Ok(())
}

// Utility: expand a leading ~ in paths
fn shellexpand(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shellexpand_home() {
        let expanded = shellexpand("~/.emotrics/channels.txt");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with(".emotrics/channels.txt"));
    }

    #[test]
    fn test_shellexpand_absolute_path_untouched() {
        assert_eq!(
            shellexpand("/etc/emotrics/channels.txt"),
            PathBuf::from("/etc/emotrics/channels.txt")
        );
    }
}
