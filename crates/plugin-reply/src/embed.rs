use plugin_core::{ChatMessage, Embed};

use crate::attachment::{AttachmentKind, classify};

const BLANK: &str = "\u{200b}";

fn jump(link: &str) -> String {
    format!("[[jump]]({link})")
}

/// Builds the preview block attributing `original` to its author.
///
/// Only the first attachment is described. When the original only carries
/// platform embeds (link previews, bot cards), the last of them is reused with
/// its fields and image dropped.
#[must_use]
pub fn build_preview(original: &ChatMessage, thumbnail_size: u16) -> Embed {
    let author = &original.author;
    let text = original.clean_content.as_str();

    let mut embed = Embed::default();
    if !text.is_empty() {
        embed.push_field(&author.display_name, format!("{text}\n{}", jump(&original.link)), true);
    }

    if let Some(first) = original.attachments.first() {
        match classify(&first.filename) {
            AttachmentKind::Image => embed.image = Some(first.url.clone()),
            AttachmentKind::Video => {
                embed.push_field(BLANK, format!("🎞️ {}", first.filename), false);
            }
            AttachmentKind::Other => {
                embed.push_field(BLANK, format!("📁 {}", first.filename), false);
            }
        }
    } else if let Some(forwarded) = original.embeds.last() {
        embed = Embed {
            fields: Vec::new(),
            image: None,
            ..forwarded.clone()
        };
        if !text.is_empty() {
            embed.push_field(&author.display_name, text, true);
        }
    }

    embed.colour = Some(author.colour.unwrap_or_default());
    embed.thumbnail = Some(author.avatar_at(thumbnail_size));

    if text.is_empty() {
        embed.push_field(BLANK, jump(&original.link), false);
    }
    embed
}
