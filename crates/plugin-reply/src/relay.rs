use std::sync::Arc;

use anyhow::{Context as _, Result};
use plugin_core::{Author, ChatMessage, ChatPlatform, DisguiseHandle, DisguisedMessage, Embed};
use tracing::{info, warn};

use crate::{
    attachment::{AttachmentFetcher, StagedAttachment},
    reply_config::ReplyConfig,
};

/// Name and avatar every relayed publish is sent under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayIdentity {
    pub username: String,
    pub avatar_url: String,
}

impl RelayIdentity {
    #[must_use]
    pub fn of(author: &Author, avatar_size: u16) -> Self {
        Self {
            username: author.display_name.clone(),
            avatar_url: author.avatar_at(avatar_size),
        }
    }

    fn message(&self) -> DisguisedMessage {
        DisguisedMessage {
            username: self.username.clone(),
            avatar_url: Some(self.avatar_url.clone()),
            ..DisguisedMessage::default()
        }
    }
}

/// Owns a disguise until [`DisguiseGuard::release`] runs. Dropping the guard
/// unreleased schedules the destruction on the current runtime.
#[derive(Debug)]
struct DisguiseGuard {
    platform: Arc<dyn ChatPlatform>,
    handle: DisguiseHandle,
    released: bool,
}

impl DisguiseGuard {
    async fn acquire(
        platform: Arc<dyn ChatPlatform>,
        message: &ChatMessage,
        name: &str,
    ) -> Result<Self> {
        let handle = platform
            .create_disguise(message.channel, name)
            .await
            .with_context(|| format!("creating disguise in channel {}", message.channel))?;
        Ok(Self {
            platform,
            handle,
            released: false,
        })
    }

    // Cancelled mid-destroy, the guard is still unreleased and Drop retries.
    async fn release(mut self) {
        let destroyed = self.platform.destroy_disguise(self.handle.clone()).await;
        self.released = true;
        if let Err(e) = destroyed {
            warn!(error = %e, disguise = self.handle.id, "Failed to destroy disguise");
        }
    }
}

impl Drop for DisguiseGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let handle = self.handle.clone();
        let id = handle.id;
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                let platform = Arc::clone(&self.platform);
                rt.spawn(async move {
                    if let Err(e) = platform.destroy_disguise(handle).await {
                        warn!(error = %e, disguise = id, "Failed to destroy abandoned disguise");
                    }
                });
            }
            Err(_) => warn!(disguise = id, "No runtime to destroy abandoned disguise"),
        }
    }
}

/// Re-publishes `content` from `trigger` under its author's identity, preceded
/// by `preview`.
///
/// The first attachment of `trigger` is downloaded before any disguise exists,
/// so a failed download leaves the channel untouched. The disguise and the
/// staged file are released whatever the publishes return.
pub async fn relay(
    platform: Arc<dyn ChatPlatform>,
    fetcher: &dyn AttachmentFetcher,
    config: &ReplyConfig,
    trigger: &ChatMessage,
    content: &str,
    preview: Embed,
) -> Result<()> {
    let identity = RelayIdentity::of(&trigger.author, config.avatar_size);

    let staged = match trigger.attachments.first() {
        Some(att) => Some(StagedAttachment::download(fetcher, att, &config.user_agent).await?),
        None => None,
    };

    let guard = DisguiseGuard::acquire(platform, trigger, &config.disguise_name).await?;
    let published = publish_pair(
        &*guard.platform,
        &guard.handle,
        &identity,
        preview,
        content,
        staged.as_ref(),
    )
    .await;
    guard.release().await;
    drop(staged);

    published?;
    info!(channel = %trigger.channel, user = %identity.username, "Relayed quote reply");
    Ok(())
}

// Preview first, then the content; the platform cannot combine both in one call.
async fn publish_pair(
    platform: &dyn ChatPlatform,
    handle: &DisguiseHandle,
    identity: &RelayIdentity,
    preview: Embed,
    content: &str,
    staged: Option<&StagedAttachment>,
) -> Result<()> {
    platform
        .publish(
            handle,
            DisguisedMessage {
                embed: Some(preview),
                wait: true,
                ..identity.message()
            },
        )
        .await
        .context("publishing preview")?;

    // Nothing left to say: an empty message would be rejected.
    if content.is_empty() && staged.is_none() {
        return Ok(());
    }

    platform
        .publish(
            handle,
            DisguisedMessage {
                content: Some(content.to_owned()),
                file: staged.map(|s| s.path().to_path_buf()),
                ..identity.message()
            },
        )
        .await
        .context("publishing reply content")
}
