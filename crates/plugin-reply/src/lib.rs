pub mod attachment;
pub mod embed;
pub mod matcher;
pub mod parser;
pub mod relay;
mod reply_config;
#[cfg(test)]
mod testing;

pub use attachment::{AttachmentFetcher, AttachmentKind, HttpFetcher, classify};
pub use parser::{ParsedReply, parse_reply};
pub use reply_config::{DEFAULT_HISTORY_LIMIT, ReplyConfig};

use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use plugin_core::factory::PluginFactory;
use plugin_core::{ChatMessage, Plugin, PluginContext, PluginSpec};
use tracing::{debug, info, warn};

pub const PLUGIN_ID: &str = "reply";

#[derive(Debug)]
pub struct ReplyPluginFactory;

impl PluginFactory for ReplyPluginFactory {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        if !specs.iter().any(|s| s.id == PLUGIN_ID) {
            specs.push(PluginSpec {
                id: PLUGIN_ID.to_owned(),
                enabled: true,
                config: serde_yaml::Value::default(),
            });
        }
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(ReplyPlugin::default())
    }
}

/// Turns `> quoted\n<@user> text` messages into relayed replies.
pub struct ReplyPlugin {
    fetcher: Arc<dyn AttachmentFetcher>,
}

impl core::fmt::Debug for ReplyPlugin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReplyPlugin").finish_non_exhaustive()
    }
}

impl Default for ReplyPlugin {
    fn default() -> Self {
        Self::with_fetcher(Arc::new(HttpFetcher::default()))
    }
}

impl ReplyPlugin {
    #[must_use]
    pub fn with_fetcher(fetcher: Arc<dyn AttachmentFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Plugin for ReplyPlugin {
    fn id(&self) -> &'static str {
        PLUGIN_ID
    }

    fn help(&self) -> &'static str {
        "Quote a message with `> text` and mention its author to reply to it"
    }

    async fn on_message(
        &self,
        ctx: &PluginContext,
        message: &ChatMessage,
        spec: &PluginSpec,
    ) -> Result<()> {
        if message.author.bot {
            return Ok(());
        }
        let Some(reply) = parse_reply(&message.content) else {
            return Ok(());
        };
        let config = ReplyConfig::from_value(&spec.config).context("parsing reply config")?;

        let Some(mut original) =
            matcher::find_original(&*ctx.platform, message, &reply, config.history_limit).await?
        else {
            debug!(
                channel = %message.channel,
                message = %message.id,
                "Quote did not match any message"
            );
            return Ok(());
        };
        match ctx
            .platform
            .resolve_author(original.channel, &original.author)
            .await
        {
            Ok(author) => original.author = author,
            Err(e) => warn!(error = %e, author = %original.author.id, "Keeping unresolved author"),
        }

        let preview = embed::build_preview(&original, config.thumbnail_size);
        relay::relay(
            Arc::clone(&ctx.platform),
            &*self.fetcher,
            &config,
            message,
            &reply.content,
            preview,
        )
        .await?;

        ctx.platform
            .delete_message(message.channel, message.id)
            .await
            .context("deleting relayed message")?;
        info!(
            channel = %message.channel,
            message = %message.id,
            original = %original.id,
            "Replaced quote reply"
        );
        Ok(())
    }
}
