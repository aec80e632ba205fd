use std::sync::OnceLock;

use plugin_core::UserId;
use regex::Regex;

static REPLY_REGEX: OnceLock<Regex> = OnceLock::new();

fn reply_regex() -> &'static Regex {
    REPLY_REGEX.get_or_init(|| {
        Regex::new(r"^((?:> [^\n]*\n)+)(?:<@!?([0-9]{1,20})>|@[^#]+#0000) ([\s\S]*)$")
            .expect("static reply regex compiles")
    })
}

/// A message recognised as a quote reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    /// Quoted lines with their `> ` markers removed. Never empty.
    pub quoted: String,
    /// Expected author of the quoted message; `None` means any bot.
    pub sender: Option<UserId>,
    pub content: String,
}

/// Recognises `> quoted\n<@id> new text`. Anything else yields `None`.
#[must_use]
pub fn parse_reply(text: &str) -> Option<ParsedReply> {
    if !text.starts_with("> ") {
        return None;
    }
    let caps = reply_regex().captures(text)?;
    let block = caps.get(1)?.as_str();

    let quoted = block
        .strip_suffix('\n')
        .unwrap_or(block)
        .split('\n')
        .map(|line| line.strip_prefix("> ").unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n");
    if quoted.is_empty() {
        return None;
    }

    let sender = match caps.get(2) {
        Some(id) => Some(UserId(id.as_str().parse().ok()?)),
        None => None,
    };

    Some(ParsedReply {
        quoted,
        sender,
        content: caps.get(3).map_or_else(String::new, |m| m.as_str().to_owned()),
    })
}
