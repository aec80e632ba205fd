//! In-memory platform for exercising the reply pipeline.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use anyhow::{Result, bail};
use async_trait::async_trait;
use plugin_core::{
    Attachment, Author, ChannelId, ChatMessage, ChatPlatform, DisguiseHandle, DisguisedMessage,
    MessageId, UserId,
};

use crate::attachment::AttachmentFetcher;

const CHANNEL: ChannelId = ChannelId(77);

pub fn message(id: u64, author: u64, bot: bool, content: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId(id),
        channel: CHANNEL,
        author: Author {
            id: UserId(author),
            bot,
            display_name: format!("user{author}"),
            colour: Some(0x00ff_8800),
            avatar_url: format!("https://cdn.test/avatars/{author}.png"),
        },
        content: content.to_owned(),
        clean_content: content.to_owned(),
        attachments: Vec::new(),
        embeds: Vec::new(),
        link: format!("https://chat.test/{}/{id}", CHANNEL.get()),
    }
}

pub fn attachment(filename: &str) -> Attachment {
    Attachment {
        filename: filename.to_owned(),
        url: format!("https://cdn.test/files/{filename}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateDisguise(String),
    Publish {
        message: DisguisedMessage,
        file_existed: bool,
    },
    DestroyDisguise(u64),
    Delete(MessageId),
}

/// History is kept oldest first, like a channel log.
#[derive(Debug, Default)]
pub struct FakePlatform {
    history: Vec<ChatMessage>,
    fetched: AtomicUsize,
    calls: Mutex<Vec<Call>>,
    fail_history: AtomicBool,
    fail_publish_at: Mutex<Option<usize>>,
    stall_destroy: AtomicBool,
    members: Vec<Author>,
}

impl FakePlatform {
    pub fn with_history(history: Vec<ChatMessage>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    /// Server-side profiles returned by `resolve_author`.
    pub fn with_members(mut self, members: Vec<Author>) -> Self {
        self.members = members;
        self
    }

    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<DisguisedMessage> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Publish { message, .. } => Some(message),
                Call::CreateDisguise(_) | Call::DestroyDisguise(_) | Call::Delete(_) => None,
            })
            .collect()
    }

    pub fn fail_history(&self) {
        self.fail_history.store(true, Ordering::SeqCst);
    }

    /// Fails the `n`th publish (0-based).
    pub fn fail_publish_at(&self, n: usize) {
        *self.fail_publish_at.lock().unwrap() = Some(n);
    }

    /// The next `destroy_disguise` is recorded but never completes.
    pub fn stall_next_destroy(&self) {
        self.stall_destroy.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn history_before(
        &self,
        channel: ChannelId,
        before: MessageId,
        limit: u8,
    ) -> Result<Vec<ChatMessage>> {
        if self.fail_history.load(Ordering::SeqCst) {
            bail!("history unavailable");
        }
        let page: Vec<_> = self
            .history
            .iter()
            .rev()
            .filter(|m| m.channel == channel && m.id < before)
            .take(usize::from(limit))
            .cloned()
            .collect();
        self.fetched.fetch_add(page.len(), Ordering::SeqCst);
        Ok(page)
    }

    async fn create_disguise(&self, channel: ChannelId, name: &str) -> Result<DisguiseHandle> {
        self.record(Call::CreateDisguise(name.to_owned()));
        Ok(DisguiseHandle { id: 500, channel })
    }

    async fn publish(&self, _handle: &DisguiseHandle, message: DisguisedMessage) -> Result<()> {
        let index = self.published().len();
        let file_existed = message.file.as_ref().is_some_and(|p| p.exists());
        self.record(Call::Publish {
            message,
            file_existed,
        });
        if *self.fail_publish_at.lock().unwrap() == Some(index) {
            bail!("publish {index} rejected");
        }
        Ok(())
    }

    async fn destroy_disguise(&self, handle: DisguiseHandle) -> Result<()> {
        self.record(Call::DestroyDisguise(handle.id));
        if self.stall_destroy.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn delete_message(&self, _channel: ChannelId, message: MessageId) -> Result<()> {
        self.record(Call::Delete(message));
        Ok(())
    }

    async fn resolve_author(&self, _channel: ChannelId, author: &Author) -> Result<Author> {
        Ok(self
            .members
            .iter()
            .find(|m| m.id == author.id)
            .cloned()
            .unwrap_or_else(|| author.clone()))
    }
}

#[derive(Debug)]
pub struct FakeFetcher {
    pub payload: Option<Vec<u8>>,
    pub user_agents: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn serving(payload: &[u8]) -> Self {
        Self {
            payload: Some(payload.to_vec()),
            user_agents: Mutex::new(Vec::new()),
        }
    }

    pub fn broken() -> Self {
        Self {
            payload: None,
            user_agents: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AttachmentFetcher for FakeFetcher {
    async fn fetch(&self, _url: &str, user_agent: &str) -> Result<Vec<u8>> {
        self.user_agents.lock().unwrap().push(user_agent.to_owned());
        match &self.payload {
            Some(bytes) => Ok(bytes.clone()),
            None => bail!("connection reset"),
        }
    }
}
