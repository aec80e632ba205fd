//! Discord implementation of [`ChatPlatform`] on top of serenity. Disguises are
//! channel webhooks.

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context as _, Result, anyhow};
use async_trait::async_trait;
use plugin_core::{
    Attachment, Author, ChannelId, ChatMessage, ChatPlatform, DisguiseHandle, DisguisedMessage,
    Embed, EmbedField, MessageId, UserId,
};
use serenity::{
    builder::{
        CreateAttachment, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateWebhook,
        ExecuteWebhook, GetMessages,
    },
    cache::Cache,
    http::Http,
    model::{
        channel::{Embed as DiscordEmbed, Message},
        id::{
            ChannelId as DiscordChannelId, GuildId, MessageId as DiscordMessageId,
            UserId as DiscordUserId, WebhookId,
        },
        user::User,
        webhook::Webhook,
    },
};
use tokio::sync::Mutex;
use tracing::debug;

const CDN: &str = "https://cdn.discordapp.com";

/// Platform bound to the guild the triggering message came from, if any.
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
    guild: Option<GuildId>,
    disguises: Mutex<HashMap<u64, Webhook>>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, guild: Option<GuildId>) -> Self {
        Self {
            http,
            cache,
            guild,
            disguises: Mutex::new(HashMap::new()),
        }
    }

    fn cache_http(&self) -> (&Arc<Cache>, &Http) {
        (&self.cache, &*self.http)
    }
}

impl core::fmt::Debug for DiscordPlatform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DiscordPlatform").finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn history_before(
        &self,
        channel: ChannelId,
        before: MessageId,
        limit: u8,
    ) -> Result<Vec<ChatMessage>> {
        let builder = GetMessages::new()
            .before(DiscordMessageId::new(before.get()))
            .limit(limit);
        let page = DiscordChannelId::new(channel.get())
            .messages(self.cache_http(), builder)
            .await
            .with_context(|| format!("listing messages in {channel}"))?;
        Ok(page.iter().map(|m| chat_message(m, &self.cache)).collect())
    }

    async fn create_disguise(&self, channel: ChannelId, name: &str) -> Result<DisguiseHandle> {
        let webhook = DiscordChannelId::new(channel.get())
            .create_webhook(self.cache_http(), CreateWebhook::new(name))
            .await
            .with_context(|| format!("creating webhook in {channel}"))?;
        let id = webhook.id.get();
        debug!(channel = %channel, webhook = id, "Created webhook");
        self.disguises.lock().await.insert(id, webhook);
        Ok(DisguiseHandle { id, channel })
    }

    async fn publish(&self, handle: &DisguiseHandle, message: DisguisedMessage) -> Result<()> {
        let webhook = self
            .disguises
            .lock()
            .await
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| anyhow!("webhook {} is not owned by this handler", handle.id))?;

        let DisguisedMessage {
            content,
            embed,
            file,
            wait,
            username,
            avatar_url,
        } = message;

        let mut builder = ExecuteWebhook::new().username(username);
        if let Some(url) = avatar_url {
            builder = builder.avatar_url(url);
        }
        if let Some(content) = content {
            builder = builder.content(content);
        }
        if let Some(embed) = embed {
            builder = builder.embed(create_embed(embed));
        }
        if let Some(path) = file {
            let upload = CreateAttachment::path(&path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            builder = builder.add_file(upload);
        }

        webhook
            .execute(self.cache_http(), wait, builder)
            .await
            .with_context(|| format!("executing webhook {}", handle.id))?;
        Ok(())
    }

    async fn destroy_disguise(&self, handle: DisguiseHandle) -> Result<()> {
        self.disguises.lock().await.remove(&handle.id);
        self.http
            .delete_webhook(WebhookId::new(handle.id), None)
            .await
            .with_context(|| format!("deleting webhook {}", handle.id))?;
        debug!(channel = %handle.channel, webhook = handle.id, "Deleted webhook");
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        self.http
            .delete_message(
                DiscordChannelId::new(channel.get()),
                DiscordMessageId::new(message.get()),
                None,
            )
            .await
            .with_context(|| format!("deleting message {message} in {channel}"))
    }

    // Message authors never carry role colour, and REST history has no member
    // data at all; the guild member has both.
    async fn resolve_author(&self, _channel: ChannelId, author: &Author) -> Result<Author> {
        let Some(guild) = self.guild else {
            return Ok(author.clone());
        };
        let member = guild
            .member(self.cache_http(), DiscordUserId::new(author.id.get()))
            .await
            .with_context(|| format!("fetching member {} of guild {guild}", author.id))?;
        Ok(Author {
            display_name: member.display_name().to_owned(),
            colour: member.colour(&self.cache).map(|c| c.0),
            ..author.clone()
        })
    }
}

pub fn chat_message(msg: &Message, cache: &Arc<Cache>) -> ChatMessage {
    let nick = msg.member.as_ref().and_then(|m| m.nick.as_deref());
    ChatMessage {
        id: MessageId(msg.id.get()),
        channel: ChannelId(msg.channel_id.get()),
        author: author(&msg.author, nick),
        content: msg.content.clone(),
        clean_content: msg.content_safe(cache),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment {
                filename: a.filename.clone(),
                url: a.url.clone(),
            })
            .collect(),
        embeds: msg.embeds.iter().map(embed_from_discord).collect(),
        link: msg.link(),
    }
}

fn author(user: &User, nick: Option<&str>) -> Author {
    Author {
        id: UserId(user.id.get()),
        bot: user.bot,
        display_name: nick.unwrap_or_else(|| user.display_name()).to_owned(),
        colour: None,
        avatar_url: user.avatar.as_ref().map_or_else(
            || user.default_avatar_url(),
            |hash| avatar_png(user.id.get(), &hash.to_string()),
        ),
    }
}

fn avatar_png(user_id: u64, hash: &str) -> String {
    format!("{CDN}/avatars/{user_id}/{hash}.png")
}

fn embed_from_discord(embed: &DiscordEmbed) -> Embed {
    Embed {
        title: embed.title.clone(),
        description: embed.description.clone(),
        url: embed.url.clone(),
        colour: embed.colour.map(|c| c.0),
        fields: embed
            .fields
            .iter()
            .map(|f| EmbedField {
                name: f.name.clone(),
                value: f.value.clone(),
                inline: f.inline,
            })
            .collect(),
        image: embed.image.as_ref().map(|i| i.url.clone()),
        thumbnail: embed.thumbnail.as_ref().map(|t| t.url.clone()),
        footer: embed.footer.as_ref().map(|f| f.text.clone()),
        author_name: embed.author.as_ref().map(|a| a.name.clone()),
    }
}

fn create_embed(embed: Embed) -> CreateEmbed {
    let mut out = CreateEmbed::new();
    if let Some(title) = embed.title {
        out = out.title(title);
    }
    if let Some(description) = embed.description {
        out = out.description(description);
    }
    if let Some(url) = embed.url {
        out = out.url(url);
    }
    if let Some(colour) = embed.colour {
        out = out.colour(colour);
    }
    for field in embed.fields {
        out = out.field(field.name, field.value, field.inline);
    }
    if let Some(image) = embed.image {
        out = out.image(image);
    }
    if let Some(thumbnail) = embed.thumbnail {
        out = out.thumbnail(thumbnail);
    }
    if let Some(footer) = embed.footer {
        out = out.footer(CreateEmbedFooter::new(footer));
    }
    if let Some(name) = embed.author_name {
        out = out.author(CreateEmbedAuthor::new(name));
    }
    out
}
