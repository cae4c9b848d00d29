use std::collections::BTreeSet;
use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;

use crate::banner::{MAX_COLLECTED_LINES, has_assistance_hint};

const HEADER: &str = "Action listing for:";

const STOPWORDS: [&str; 12] = [
    "action",
    "list",
    "for",
    "the",
    "and",
    "you",
    "are",
    "can",
    "use",
    "these",
    "actions",
    "available",
];

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z]{2,}\b").expect("word regex"));

/// What the action-list machine did with one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStep {
    Ignored,
    Claimed,
    /// The listing closed with these verbs, sorted.
    Completed(Vec<String>),
    Abandoned,
}

/// Collects the verbs of an `Action listing for:` block.
#[derive(Debug, Default)]
pub struct ActionListMachine {
    collecting: bool,
    lines: usize,
    vocabulary: BTreeSet<String>,
}

impl ActionListMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    pub fn feed(&mut self, clean: &str) -> ActionStep {
        if !self.collecting {
            if !clean.contains(HEADER) {
                return ActionStep::Ignored;
            }
            debug!("[actions] start: {clean:?}");
            self.collecting = true;
            self.lines = 0;
            self.vocabulary.clear();
            return ActionStep::Claimed;
        }

        let trimmed = clean.trim();
        if trimmed.is_empty() || trimmed == ":" || has_assistance_hint(clean) {
            self.collecting = false;
            let words: Vec<String> =
                std::mem::take(&mut self.vocabulary).into_iter().collect();
            if words.is_empty() {
                return ActionStep::Claimed;
            }
            return ActionStep::Completed(words);
        }

        self.lines += 1;
        if self.lines >= MAX_COLLECTED_LINES {
            warn!("abandoning action listing after {} lines", self.lines);
            self.reset();
            return ActionStep::Abandoned;
        }

        for word in WORD.find_iter(clean).map(|m| m.as_str()) {
            let stop = STOPWORDS
                .iter()
                .any(|stopword| stopword.eq_ignore_ascii_case(word));
            if !stop {
                self.vocabulary.insert(word.to_string());
            }
        }
        ActionStep::Claimed
    }

    pub fn reset(&mut self) {
        self.collecting = false;
        self.lines = 0;
        self.vocabulary.clear();
    }
}
