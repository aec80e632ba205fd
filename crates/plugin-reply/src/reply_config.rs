use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReplyConfig {
    /// How many messages back the matcher may look for the quoted original.
    pub history_limit: usize,
    /// Sent when downloading attachments; some CDNs reject bare clients.
    pub user_agent: String,
    pub disguise_name: String,
    pub thumbnail_size: u16,
    pub avatar_size: u16,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            user_agent: "Mozilla/5.0".to_owned(),
            disguise_name: "Placeholder".to_owned(),
            thumbnail_size: 32,
            avatar_size: 128,
        }
    }
}

impl ReplyConfig {
    /// Null config means defaults.
    pub fn from_value(value: &serde_yaml::Value) -> anyhow::Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_value(value.clone())?)
    }
}
