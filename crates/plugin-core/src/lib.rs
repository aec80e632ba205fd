pub mod factory;
pub mod message;
pub mod platform;

pub use message::{
    Attachment, Author, ChannelId, ChatMessage, Embed, EmbedField, MessageId, UserId,
};
pub use platform::{ChatPlatform, DisguiseHandle, DisguisedMessage, MAX_HISTORY_PAGE};

use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Clone, Debug)]
pub struct PluginContext {
    pub platform: Arc<dyn ChatPlatform>,
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn help(&self) -> &'static str;

    async fn on_message(
        &self,
        ctx: &PluginContext,
        message: &ChatMessage,
        spec: &PluginSpec,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginSpec {
    pub id: String,
    #[serde(default = "enabled_true")]
    pub enabled: bool,
    #[serde(default)]
    pub config: serde_yaml::Value,
}

const fn enabled_true() -> bool {
    true
}

#[derive(Clone)]
pub struct PluginEntry {
    pub spec: PluginSpec,
    pub plugin: Arc<dyn Plugin>,
}

impl core::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("spec", &self.spec)
            .field("plugin", &self.plugin.id())
            .finish()
    }
}

#[derive(Clone, Default, Debug)]
pub struct PluginRegistry {
    inner: Arc<RwLock<HashMap<String, PluginEntry>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        spec: PluginSpec,
        plugin: Arc<dyn Plugin>,
    ) -> Option<PluginEntry> {
        let mut inner = self.inner.write().await;
        inner.insert(spec.id.clone(), PluginEntry { spec, plugin })
    }

    pub async fn entries(&self) -> Vec<(String, PluginEntry)> {
        let inner = self.inner.read().await;
        inner
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }

    #[must_use]
    pub async fn is_enabled(&self, id: &str) -> bool {
        let inner = self.inner.read().await;
        inner.get(id).is_some_and(|entry| entry.spec.enabled)
    }
}

#[must_use]
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
