//! Chat line classification.
//!
//! Teleconference servers disagree on how a message looks on the wire. The
//! dialects handled here are bracketed (`[Bob:] hi`), `From` prefixed
//! (`From Bob: hi`) and verb based (`Bob says: hi`), plus page
//! notifications. Every shape is one entry of an ordered rule table and the
//! first matching entry wins, so the more specific shapes sit above the
//! generic public ones.

use std::sync::LazyLock;

use chrono::{DateTime, Local};
use log::trace;
use regex::Regex;

use telechat_codec::extract_urls;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatKind {
    Public,
    Whisper,
    Directed,
    Page,
}

/// Wire format a rule recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Bracket,
    From,
    Verb,
    Page,
}

/// One classified chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub timestamp: DateTime<Local>,
    pub sender: String,
    pub recipient: Option<String>,
    pub kind: ChatKind,
    pub text: String,
    pub urls: Vec<String>,
}

impl ChatEvent {
    /// Whether the message is meant for `username`: whispers and pages
    /// always are, directed messages when the recipient is the user or
    /// literally "you".
    pub fn is_directed_at(&self, username: &str) -> bool {
        match self.kind {
            ChatKind::Whisper | ChatKind::Page => true,
            ChatKind::Directed => self.recipient.as_deref().is_some_and(|to| {
                to.eq_ignore_ascii_case("you")
                    || (!username.is_empty()
                        && to.eq_ignore_ascii_case(username))
            }),
            ChatKind::Public => false,
        }
    }

    /// Line appended to the sender's history.
    pub fn log_line(&self) -> String {
        let time = self.timestamp.format("%Y-%m-%d %H:%M:%S");
        match (&self.kind, &self.recipient) {
            (ChatKind::Whisper, _) => {
                format!("[{time}] {} (whispered): {}", self.sender, self.text)
            },
            (ChatKind::Page, _) => {
                format!("[{time}] {} (paged): {}", self.sender, self.text)
            },
            (_, Some(to)) => {
                format!("[{time}] {} (to {to}): {}", self.sender, self.text)
            },
            (_, None) => format!("[{time}] {}: {}", self.sender, self.text),
        }
    }
}

struct Rule {
    dialect: Dialect,
    kind: ChatKind,
    pattern: Regex,
}

impl Rule {
    fn new(dialect: Dialect, kind: ChatKind, pattern: &str) -> Self {
        Self {
            dialect,
            kind,
            pattern: Regex::new(pattern).expect("chat rule compiles"),
        }
    }
}

/// Rules in priority order.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use ChatKind::*;
    vec![
        Rule::new(
            Dialect::Page,
            Page,
            r"^(?P<sender>[^\s\[\]:]+) is paging you\b[.!:]?\s*(?P<text>.*)$",
        ),
        Rule::new(
            Dialect::Page,
            Page,
            r"^(?P<sender>[^\s\[\]:]+) pages you:\s*(?P<text>.*)$",
        ),
        Rule::new(
            Dialect::Bracket,
            Whisper,
            r"^\[(?P<sender>[^\[\]():]+?) \(whispered\):\]\s*(?P<text>.*)$",
        ),
        Rule::new(
            Dialect::From,
            Whisper,
            r"^From (?P<sender>\S+?) \(whispered\):\s*(?P<text>.*)$",
        ),
        Rule::new(
            Dialect::Verb,
            Whisper,
            r"^(?P<sender>[^\s\[\]:]+) whispers(?: to you)?:\s*(?P<text>.*)$",
        ),
        Rule::new(
            Dialect::Bracket,
            Directed,
            r"^\[(?P<sender>[^\[\]():]+?) \(to (?P<recipient>[^)]+)\):\]\s*(?P<text>.*)$",
        ),
        Rule::new(
            Dialect::From,
            Directed,
            r"^From (?P<sender>\S+?) \(to (?P<recipient>[^)]+)\):\s*(?P<text>.*)$",
        ),
        Rule::new(
            Dialect::Verb,
            Directed,
            r"^(?P<sender>[^\s\[\]:]+) says to (?P<recipient>[^:]+?):\s*(?P<text>.*)$",
        ),
        Rule::new(
            Dialect::Bracket,
            Public,
            r"^\[(?P<sender>[^\[\]():]+?):\]\s*(?P<text>.*)$",
        ),
        Rule::new(
            Dialect::From,
            Public,
            r"^From (?P<sender>[^\s():]+):\s*(?P<text>.*)$",
        ),
        Rule::new(
            Dialect::Verb,
            Public,
            r"^(?P<sender>[^\s\[\]:]+) says:\s*(?P<text>.*)$",
        ),
    ]
});

/// Lines that are never chat even when a rule would accept them.
static SKIP: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^[\p{P}\p{S}\s]*$",
        r"(?i)^you are in\b",
        r"^Topic:",
        r"(?i)\b(?:are|is) here with you\b",
        r"^Action listing for:",
        r"(?i)\bpress (?:a|any|enter|return)\b",
        r"(?i)--\s*more\s*--",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("skip rule compiles"))
    .collect()
});

/// Classify one clean line, stamping it with the current time.
pub fn classify(line: &str) -> Option<ChatEvent> {
    classify_at(line, Local::now())
}

/// Classify one clean line with an explicit timestamp.
pub fn classify_at(
    line: &str,
    timestamp: DateTime<Local>,
) -> Option<ChatEvent> {
    let line = line.trim();
    if SKIP.iter().any(|skip| skip.is_match(line)) {
        return None;
    }

    RULES.iter().find_map(|rule| {
        let caps = rule.pattern.captures(line)?;
        trace!("[classify] {:?}/{:?}: {line:?}", rule.dialect, rule.kind);

        let sender = caps.name("sender")?.as_str().trim();
        let text = caps.name("text").map_or("", |m| m.as_str()).trim();
        Some(ChatEvent {
            timestamp,
            sender: sender.to_string(),
            recipient: caps
                .name("recipient")
                .map(|m| m.as_str().trim().to_string()),
            kind: rule.kind,
            text: text.to_string(),
            urls: extract_urls(text),
        })
    })
}
