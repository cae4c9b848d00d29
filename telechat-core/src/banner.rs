//! Room banner detection and extraction.
//!
//! A banner is the free-form block a BBS prints on room entry: the room
//! name, an optional topic and the people present. Several dialects exist
//! and none is framed, so collection is line driven. A start marker opens
//! a collection, every following line is claimed, and the first line that
//! carries an end marker closes it. The collected lines, joined with `\n`,
//! are then mined for the room, the topic and the member list.

use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;

use crate::event::RoomSnapshot;

/// Lines one collection may claim before it is abandoned.
pub(crate) const MAX_COLLECTED_LINES: usize = 64;
/// Clean bytes one collection may claim before it is abandoned.
pub(crate) const MAX_COLLECTED_BYTES: usize = 16 * 1024;

const ASSISTANCE_HINTS: [&str; 5] =
    ["just press", "just type", "assistance", "help", "need any"];

const WITH_YOU_PHRASES: [&str; 3] =
    ["are here with you", "is here with you", "with you."];

static CHANNEL_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bchannel\b").expect("channel regex"));

static ROOM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"You are in (?:the )?([^.,!\n]+)").expect("room regex")
});

static TOPIC_PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Topic:\s*\(([^)]*)\)").expect("topic regex")
});

static TOPIC_FREE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)Topic:[ \t]*(.*?)(?:\.\s|\.$|$)").expect("topic regex")
});

static WITH_YOU: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:are|is) here with you|\bwith you\.")
        .expect("with-you regex")
});

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("remark regex"));

/// True when `clean` carries one of the hints that close a listing.
pub(crate) fn has_assistance_hint(clean: &str) -> bool {
    let lower = clean.to_lowercase();
    ASSISTANCE_HINTS.iter().any(|hint| lower.contains(hint))
}

fn is_banner_start(clean: &str) -> bool {
    clean.contains("You are in")
        || clean.trim_start().starts_with("Topic:")
        || CHANNEL_WORD.is_match(clean)
}

fn is_banner_end(clean: &str) -> bool {
    clean.trim() == ":"
        || WITH_YOU_PHRASES.iter().any(|phrase| clean.contains(phrase))
        || has_assistance_hint(clean)
}

/// What the banner machine did with one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BannerStep {
    /// Not part of a banner.
    Ignored,
    /// Accumulated into the open banner.
    Claimed,
    /// The line closed the banner.
    Completed(RoomSnapshot),
    /// The open banner ran past its budget and was dropped.
    Abandoned,
}

#[derive(Debug, Default)]
pub struct BannerMachine {
    collecting: bool,
    lines: Vec<String>,
    bytes: usize,
}

impl BannerMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    /// Offer one clean line.
    pub fn feed(&mut self, clean: &str) -> BannerStep {
        if !self.collecting {
            if !is_banner_start(clean) {
                return BannerStep::Ignored;
            }
            debug!("[banner] start: {clean:?}");
            self.collecting = true;
        }

        self.lines.push(clean.to_string());
        self.bytes += clean.len();

        if is_banner_end(clean) {
            let text = self.lines.join("\n");
            self.reset();
            return BannerStep::Completed(extract(&text));
        }

        if self.lines.len() >= MAX_COLLECTED_LINES
            || self.bytes > MAX_COLLECTED_BYTES
        {
            warn!(
                "abandoning banner after {} lines ({} bytes) without an end \
                 marker",
                self.lines.len(),
                self.bytes
            );
            self.reset();
            return BannerStep::Abandoned;
        }

        BannerStep::Claimed
    }

    pub fn reset(&mut self) {
        self.collecting = false;
        self.lines.clear();
        self.bytes = 0;
    }
}

/// Parse the clean text of a completed banner, one collected line per
/// `\n` separated row.
pub fn extract(text: &str) -> RoomSnapshot {
    let room = ROOM
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|room| !room.is_empty());

    let (topic, members_from) = match TOPIC_PARENTHESIZED.captures(text) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str().to_string()),
            caps.get(0).map(|m| m.end()),
        ),
        None => free_topic(text),
    };
    let topic = topic
        .map(|topic| topic.trim().to_string())
        .filter(|topic| !topic.is_empty());

    let mut snapshot = RoomSnapshot::new(room, topic);
    if let Some(segment) = user_segment(text, members_from) {
        for name in split_members(segment) {
            snapshot.members.insert(name);
        }
    }
    snapshot
}

/// An unparenthesized topic runs to the end of its sentence or line. When
/// the member list shares that sentence, the topic stops before the first
/// listed member. Returns the topic and where the member list may start.
fn free_topic(text: &str) -> (Option<String>, Option<usize>) {
    let Some(caps) = TOPIC_FREE.captures(text) else {
        return (None, None);
    };
    let (Some(whole), Some(run)) = (caps.get(0), caps.get(1)) else {
        return (None, None);
    };

    let phrase = WITH_YOU
        .find_at(text, run.start())
        .filter(|phrase| phrase.start() < run.end());
    let Some(phrase) = phrase else {
        return (Some(run.as_str().to_string()), Some(whole.end()));
    };

    // Names carry no spaces, so the first listed member is the last word
    // before the first separator.
    let listed = &text[run.start()..phrase.start()];
    let first_separator = [listed.find(','), listed.find(" and ")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(listed.len());
    let head = listed[..first_separator].trim_end();
    match head.rfind(char::is_whitespace) {
        Some(split) => {
            (Some(head[..split].to_string()), Some(run.start() + split))
        },
        None => (None, Some(run.start())),
    }
}

/// The text naming the people present, if the banner has one.
fn user_segment(text: &str, members_from: Option<usize>) -> Option<&str> {
    let search_from = members_from.unwrap_or(0);
    let phrase = WITH_YOU.find_at(text, search_from)?;

    let start = match members_from {
        Some(end) => end,
        None => last_sentence_boundary(&text[..phrase.start()]),
    };
    Some(&text[start..phrase.start()])
}

/// Byte offset just past the last line break, or the last `.`, `!` or `:`
/// that is followed by whitespace, or 0.
fn last_sentence_boundary(prefix: &str) -> usize {
    let mut next_is_space = true;
    for (idx, c) in prefix.char_indices().rev() {
        if c == '\n' {
            return idx + 1;
        }
        if matches!(c, '.' | '!' | ':') && next_is_space {
            return idx + c.len_utf8();
        }
        next_is_space = c.is_whitespace();
    }
    0
}

fn split_members(segment: &str) -> Vec<String> {
    segment
        .split(" and ")
        .flat_map(|part| part.split(','))
        .filter_map(clean_member)
        .collect()
}

fn clean_member(token: &str) -> Option<String> {
    let token = PARENTHESIZED.replace_all(token, "");
    let token = token.trim();
    let lower = token.to_lowercase();
    if lower.starts_with("topic:")
        || lower.contains("just press")
        || lower.contains("just type")
        || lower.contains("assistance")
    {
        return None;
    }

    let keep = |c: &char| c.is_alphanumeric() || matches!(c, '.' | '_' | '-');
    let name = match token.split_once('@') {
        Some((user, domain)) => {
            let user: String = user.chars().filter(keep).collect();
            let domain: String = domain.chars().filter(keep).collect();
            if domain.is_empty() {
                user
            } else {
                format!("{user}@{domain}")
            }
        },
        None => token.chars().filter(keep).collect(),
    };

    let name = name.trim_matches(|c| c == '.' || c == '-');
    if name.chars().count() < 2 || name.eq_ignore_ascii_case("you") {
        return None;
    }
    Some(name.to_string())
}
