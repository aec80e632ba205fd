mod discord;
mod logging;
mod plugins;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result, anyhow};
use async_trait::async_trait;
use clap::Parser;
use serde::Deserialize;
use serenity::{
    client::{Client, Context, EventHandler},
    model::{
        channel::Message,
        gateway::{GatewayIntents, Ready},
    },
};
use tracing::{debug, info, warn};

use crate::{discord::DiscordPlatform, logging::init_tracing};
use plugin_core::{ChatPlatform, PluginContext, PluginRegistry, PluginSpec, truncate};

#[derive(Parser, Debug)]
#[command(
    name = "quote-reply-bot",
    version,
    about = "Turns quoted messages into native-looking replies"
)]
struct Args {
    /// Bot token from the developer portal
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: String,

    /// Path to YAML config with per-plugin settings
    #[arg(long, env = "BOT_CONFIG", default_value = "./config.yaml")]
    config: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub(crate) struct BotConfig {
    #[serde(default)]
    pub(crate) plugins: Vec<PluginSpec>,
}

#[derive(Debug)]
struct Handler {
    registry: Arc<PluginRegistry>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        let message = discord::chat_message(&msg, &ctx.cache);
        debug!(
            channel = %message.channel,
            sender = %message.author.id,
            bot = message.author.bot,
            attachments = message.attachments.len(),
            body = %truncate(&message.content, 200),
            "Incoming message"
        );

        let platform: Arc<dyn ChatPlatform> = Arc::new(DiscordPlatform::new(
            Arc::clone(&ctx.http),
            Arc::clone(&ctx.cache),
            msg.guild_id,
        ));
        let plugin_ctx = PluginContext { platform };

        for (plugin_id, entry) in self.registry.entries().await {
            if !self.registry.is_enabled(&plugin_id).await {
                continue;
            }
            if let Err(e) = entry
                .plugin
                .on_message(&plugin_ctx, &message, &entry.spec)
                .await
            {
                warn!(
                    error = ?e,
                    plugin = %plugin_id,
                    message = %message.id,
                    "Plugin on_message failed"
                );
            }
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "Connected to gateway");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    // Load .env if present so clap can pick up env vars.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = load_config(&args.config)?;
    let registry = plugins::build_registry(&config).await;
    let mut plugin_ids: Vec<String> = registry
        .entries()
        .await
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    plugin_ids.sort();
    info!(plugins = ?plugin_ids, "Registered plugins");

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&args.token, intents)
        .event_handler(Handler { registry })
        .await
        .context("building discord client")?;

    info!("Starting gateway… Press Ctrl+C to stop.");
    client
        .start()
        .await
        .map_err(|e| anyhow!("gateway terminated: {e}"))
}

fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        info!(path = %path.display(), "No config file; using defaults");
        return Ok(BotConfig::default());
    }
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;
    let cfg: BotConfig = serde_yaml::from_str(&yaml).context("parsing YAML config")?;
    Ok(cfg)
}
