use core::fmt;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

snowflake!(
    /// Identity of a chat participant.
    UserId
);
snowflake!(ChannelId);
snowflake!(
    /// Message ids grow with time; history is paged by them.
    MessageId
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub bot: bool,
    pub display_name: String,
    /// Display colour inside the channel's community, when it has one.
    pub colour: Option<u32>,
    /// Unsized PNG avatar URL. See [`Author::avatar_at`].
    pub avatar_url: String,
}

impl Author {
    /// Avatar URL requested at `size` pixels.
    #[must_use]
    pub fn avatar_at(&self, size: u16) -> String {
        let sep = if self.avatar_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}size={size}", self.avatar_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-neutral rich preview block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub colour: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub footer: Option<String>,
    pub author_name: Option<String>,
}

impl Embed {
    #[must_use]
    pub fn field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.push_field(name, value, inline);
        self
    }

    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub channel: ChannelId,
    pub author: Author,
    /// Raw text as sent, including mention markup.
    pub content: String,
    /// Text with mentions resolved to readable names.
    pub clean_content: String,
    pub attachments: Vec<Attachment>,
    pub embeds: Vec<Embed>,
    /// Permalink to this message.
    pub link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(avatar_url: &str) -> Author {
        Author {
            id: UserId(1),
            bot: false,
            display_name: "ann".to_owned(),
            colour: None,
            avatar_url: avatar_url.to_owned(),
        }
    }

    #[test]
    fn avatar_size_is_appended_as_query() {
        let a = author("https://cdn.example/avatars/1/abc.png");
        assert_eq!(a.avatar_at(32), "https://cdn.example/avatars/1/abc.png?size=32");
    }

    #[test]
    fn avatar_size_extends_existing_query() {
        let a = author("https://cdn.example/a.png?v=2");
        assert_eq!(a.avatar_at(128), "https://cdn.example/a.png?v=2&size=128");
    }

    #[test]
    fn embed_builder_keeps_field_order() {
        let e = Embed::default().field("a", "1", true).field("b", "2", false);
        let names: Vec<_> = e.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(!e.fields[1].inline);
    }
}
