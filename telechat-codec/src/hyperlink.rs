//! URL detection inside plain text.

use std::sync::LazyLock;

use regex::Regex;

/// `http://`, `https://` or a bare `www.` followed by anything that is not
/// whitespace or a quote.
const URL_PATTERN: &str = r#"(?i)(?:https?://|\bwww\.)[^\s"']+"#;

/// Characters that end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] =
    &['.', ',', ';', ':', ')', ']', '}', '"', '\''];

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(URL_PATTERN).expect("URL pattern compiles"));

/// A piece of scanned text. `url` is set for link segments and holds the
/// normalized target (bare `www.` gains an `http://` prefix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub url: Option<String>,
}

impl<'a> Segment<'a> {
    fn plain(text: &'a str) -> Self {
        Self { text, url: None }
    }

    pub fn is_link(&self) -> bool {
        self.url.is_some()
    }
}

/// Split `text` into plain and link segments, in order.
///
/// Concatenating the segment texts gives back `text` unchanged.
pub fn scan(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for found in URL_REGEX.find_iter(text) {
        let Some(link) = trim_link(found.as_str()) else {
            continue;
        };

        let start = found.start();
        let end = start + link.len();
        if start > cursor {
            segments.push(Segment::plain(&text[cursor..start]));
        }
        segments.push(Segment {
            text: link,
            url: Some(normalize(link)),
        });
        cursor = end;
    }

    if cursor < text.len() {
        segments.push(Segment::plain(&text[cursor..]));
    }

    segments
}

/// Normalized URLs found in `text`.
pub fn extract_urls(text: &str) -> Vec<String> {
    scan(text).into_iter().filter_map(|segment| segment.url).collect()
}

fn trim_link(raw: &str) -> Option<&str> {
    let trimmed = raw.trim_end_matches(TRAILING_PUNCTUATION);
    let prefix_len = if trimmed.len() >= 4
        && trimmed[..4].eq_ignore_ascii_case("www.")
    {
        4
    } else {
        trimmed.find("://").map_or(0, |idx| idx + 3)
    };

    (trimmed.len() > prefix_len).then_some(trimmed)
}

fn normalize(link: &str) -> String {
    if link.len() >= 4 && link[..4].eq_ignore_ascii_case("www.") {
        format!("http://{link}")
    } else {
        link.to_string()
    }
}
