use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::message::{Author, ChannelId, ChatMessage, Embed, MessageId};

/// Largest page a single history request may ask for.
pub const MAX_HISTORY_PAGE: u8 = 100;

/// Opaque reference to a temporary channel-scoped identity mask.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisguiseHandle {
    pub id: u64,
    pub channel: ChannelId,
}

/// One outbound publish through a disguise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisguisedMessage {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    pub file: Option<PathBuf>,
    /// Block until the platform confirms the message was created.
    pub wait: bool,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Chat platform operations the bot consumes.
///
/// Implementations wrap a live connection; every call is a network round trip.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Up to `limit` messages posted strictly before `before`, newest first.
    async fn history_before(
        &self,
        channel: ChannelId,
        before: MessageId,
        limit: u8,
    ) -> Result<Vec<ChatMessage>>;

    async fn create_disguise(&self, channel: ChannelId, name: &str) -> Result<DisguiseHandle>;

    async fn publish(&self, handle: &DisguiseHandle, message: DisguisedMessage) -> Result<()>;

    async fn destroy_disguise(&self, handle: DisguiseHandle) -> Result<()>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()>;

    /// `author` as the community hosting `channel` presents them: server
    /// nickname and role colour. History pages may omit both.
    async fn resolve_author(&self, _channel: ChannelId, author: &Author) -> Result<Author> {
        Ok(author.clone())
    }
}

impl core::fmt::Debug for dyn ChatPlatform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ChatPlatform")
    }
}
