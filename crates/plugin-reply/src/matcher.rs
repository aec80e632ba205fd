use std::sync::OnceLock;

use anyhow::{Context as _, Result};
use plugin_core::{ChatMessage, ChatPlatform, MAX_HISTORY_PAGE, UserId};
use regex::Regex;
use tracing::debug;

use crate::parser::ParsedReply;

static QUOTE_LINE_REGEX: OnceLock<Regex> = OnceLock::new();

fn quote_line_regex() -> &'static Regex {
    QUOTE_LINE_REGEX
        .get_or_init(|| Regex::new(r"\n> [^\n]*").expect("static quote regex compiles"))
}

/// Whether `candidate` could be the message `reply` quotes.
#[must_use]
pub fn is_original(candidate: &ChatMessage, reply: &ParsedReply) -> bool {
    sender_matches(candidate, reply.sender) && content_matches(&candidate.content, &reply.quoted)
}

fn sender_matches(candidate: &ChatMessage, sender: Option<UserId>) -> bool {
    match sender {
        Some(id) => candidate.author.id == id,
        None => candidate.author.bot,
    }
}

// A relayed reply carries its own quote block; compare with those lines removed.
fn content_matches(content: &str, quoted: &str) -> bool {
    if content == quoted {
        return true;
    }
    let prefixed = format!("\n{content}");
    let stripped = quote_line_regex().replace_all(&prefixed, "");
    stripped.strip_prefix('\n') == Some(quoted)
}

/// Walks channel history behind `trigger`, newest first, and returns the first
/// message `reply` quotes. At most `limit` messages are fetched.
pub async fn find_original(
    platform: &dyn ChatPlatform,
    trigger: &ChatMessage,
    reply: &ParsedReply,
    limit: usize,
) -> Result<Option<ChatMessage>> {
    let mut cursor = trigger.id;
    let mut scanned = 0usize;

    while scanned < limit {
        let want = u8::try_from(limit - scanned)
            .unwrap_or(MAX_HISTORY_PAGE)
            .min(MAX_HISTORY_PAGE);
        let page = platform
            .history_before(trigger.channel, cursor, want)
            .await
            .with_context(|| format!("fetching history before {cursor}"))?;
        let Some(last) = page.last() else {
            break;
        };
        cursor = last.id;
        let exhausted = page.len() < usize::from(want);

        for candidate in page.into_iter().take(limit - scanned) {
            scanned += 1;
            if is_original(&candidate, reply) {
                debug!(
                    channel = %trigger.channel,
                    original = %candidate.id,
                    scanned,
                    "Found quoted message"
                );
                return Ok(Some(candidate));
            }
        }
        if exhausted {
            break;
        }
    }

    debug!(channel = %trigger.channel, scanned, "No quoted message in history");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePlatform, message};

    fn reply(quoted: &str, sender: Option<u64>) -> ParsedReply {
        ParsedReply {
            quoted: quoted.to_owned(),
            sender: sender.map(UserId),
            content: String::new(),
        }
    }

    #[test]
    fn nested_quote_is_tolerated() {
        let old = message(1, 7, false, "> inner\nouter");
        assert!(is_original(&old, &reply("outer", Some(7))));
    }

    #[test]
    fn multiline_original_with_several_nested_quotes() {
        let old = message(1, 7, false, "> q1\n> q2\nline a\nline b");
        assert!(is_original(&old, &reply("line a\nline b", Some(7))));
        assert!(is_original(&old, &reply("> q1\n> q2\nline a\nline b", Some(7))));
        assert!(!is_original(&old, &reply("line a", Some(7))));
    }

    #[test]
    fn unknown_sender_requires_bot_author() {
        let human = message(1, 7, false, "hi");
        let bot = message(2, 8, true, "hi");
        assert!(!is_original(&human, &reply("hi", None)));
        assert!(is_original(&bot, &reply("hi", None)));
    }

    #[test]
    fn explicit_sender_requires_exact_id() {
        let bot = message(2, 8, true, "hi");
        assert!(!is_original(&bot, &reply("hi", Some(999))));
    }

    #[tokio::test]
    async fn finds_original_behind_unrelated_chatter() {
        let mut history = vec![message(10, 7, false, "the original")];
        for i in 0..50 {
            history.push(message(11 + i, 3, false, &format!("noise {i}")));
        }
        let trigger = message(100, 3, false, "> the original\n<@!7> agreed");
        let platform = FakePlatform::with_history(history);

        let found = find_original(&platform, &trigger, &reply("the original", Some(7)), 10_000)
            .await
            .unwrap();
        assert_eq!(found.map(|m| m.id.get()), Some(10));
    }

    #[tokio::test]
    async fn first_match_wins_newest_first() {
        let history = vec![message(1, 7, false, "same"), message(2, 7, false, "same")];
        let trigger = message(3, 3, false, "");
        let platform = FakePlatform::with_history(history);
        let found = find_original(&platform, &trigger, &reply("same", Some(7)), 10)
            .await
            .unwrap();
        assert_eq!(found.map(|m| m.id.get()), Some(2));
    }

    #[tokio::test]
    async fn never_scans_past_the_cap() {
        let mut history = vec![message(1, 7, false, "too old")];
        for i in 0..300 {
            history.push(message(2 + i, 3, false, "noise"));
        }
        let trigger = message(1000, 3, false, "");
        let platform = FakePlatform::with_history(history);

        let found = find_original(&platform, &trigger, &reply("too old", Some(7)), 250)
            .await
            .unwrap();
        assert!(found.is_none());
        assert_eq!(platform.fetched(), 250);
    }

    #[tokio::test]
    async fn trigger_itself_is_not_a_candidate() {
        let trigger = message(5, 7, false, "x");
        let platform = FakePlatform::with_history(vec![trigger.clone()]);
        let found = find_original(&platform, &trigger, &reply("x", Some(7)), 10)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn history_errors_propagate() {
        let trigger = message(5, 7, false, "x");
        let platform = FakePlatform::default();
        platform.fail_history();
        assert!(find_original(&platform, &trigger, &reply("x", None), 10).await.is_err());
    }
}
