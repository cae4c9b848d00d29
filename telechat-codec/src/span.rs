use log::debug;

use crate::color::{bright_color, standard_color};
use crate::escape::{Token, Tokens, push_printable};
use crate::hyperlink;
use crate::style::{BlinkGroup, StyleColor, StyleState};

/// A run of text sharing one style snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub style: StyleState,
    /// Normalized link target. Presentation draws links distinctly but the
    /// underlying `style` still applies.
    pub hyperlink: Option<String>,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, style: StyleState) -> Self {
        Self {
            text: text.into(),
            style,
            hyperlink: None,
        }
    }

    #[inline]
    pub fn is_hyperlink(&self) -> bool {
        self.hyperlink.is_some()
    }
}

/// Stateful SGR interpreter.
///
/// The current [`StyleState`] carries over between calls, so a color set on
/// one line keeps applying to the following lines until the stream resets
/// it. The parser also allocates blink group identifiers for the whole
/// session.
#[derive(Debug, Clone, Default)]
pub struct SpanParser {
    style: StyleState,
    next_blink: u32,
}

impl SpanParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Style that will apply to the next printed character.
    pub fn style(&self) -> &StyleState {
        &self.style
    }

    /// Forget the current style. Blink ids keep counting up so groups from
    /// an earlier connection never collide with new ones.
    pub fn reset(&mut self) {
        self.style.reset();
    }

    /// Split `text` into styled spans, updating the current style.
    pub fn apply(&mut self, text: &str) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        let mut pending = String::new();

        for token in Tokens::new(text) {
            match token {
                Token::Text(text) => push_printable(&mut pending, text),
                Token::Malformed(text) => {
                    debug!("[literal escape] {text:?}");
                    push_printable(&mut pending, text);
                },
                Token::Sgr(params) => {
                    self.flush(&mut pending, &mut spans);
                    self.select_graphic_rendition(params);
                },
                Token::Control => {},
            }
        }

        self.flush(&mut pending, &mut spans);
        spans
    }

    /// [`SpanParser::apply`] followed by hyperlink splitting of every span.
    pub fn render(&mut self, text: &str) -> Vec<TextSpan> {
        self.apply(text)
            .into_iter()
            .flat_map(split_links)
            .collect()
    }

    fn flush(&self, pending: &mut String, spans: &mut Vec<TextSpan>) {
        if pending.is_empty() {
            return;
        }

        spans.push(TextSpan::new(std::mem::take(pending), self.style.clone()));
    }

    fn select_graphic_rendition(&mut self, params: &str) {
        // An empty list is a reset, and so is an empty field (`ESC[;31m`).
        for param in params.split(';') {
            let code = if param.is_empty() {
                0
            } else {
                match param.parse::<u16>() {
                    Ok(code) => code,
                    Err(_) => {
                        debug!("[unexpected sgr] param: {param:?}");
                        continue;
                    },
                }
            };

            match code {
                0 => self.style.reset(),
                1 => {
                    self.style.color =
                        self.style.color.map(StyleColor::to_bright)
                },
                5 | 6 => {
                    let group = BlinkGroup(self.next_blink);
                    self.next_blink = self.next_blink.wrapping_add(1);
                    self.style.blinks.push(group);
                },
                30..=37 => {
                    self.style.color =
                        standard_color(code).map(StyleColor::Foreground)
                },
                39 | 49 => self.style.color = None,
                40..=47 => {
                    self.style.color =
                        standard_color(code - 10).map(StyleColor::Background)
                },
                90..=97 => {
                    self.style.color =
                        bright_color(code).map(StyleColor::Foreground)
                },
                _ => debug!("[unsupported sgr] code: {code}"),
            }
        }
    }
}

fn split_links(span: TextSpan) -> Vec<TextSpan> {
    let segments = hyperlink::scan(&span.text);
    if !segments.iter().any(hyperlink::Segment::is_link) {
        return vec![span];
    }

    segments
        .into_iter()
        .map(|segment| TextSpan {
            text: segment.text.to_string(),
            style: span.style.clone(),
            hyperlink: segment.url,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StdColor;

    fn fg(color: StdColor) -> Option<StyleColor> {
        Some(StyleColor::Foreground(color))
    }

    #[test]
    fn colored_text_round_trips_to_default() {
        let mut parser = SpanParser::new();
        let spans = parser.apply("\x1b[31mRED\x1b[0m");

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "RED");
        assert_eq!(spans[0].style.color, fg(StdColor::Red));
        assert_eq!(parser.style(), &StyleState::default());
    }

    #[test]
    fn reset_clears_blink_groups() {
        let mut parser = SpanParser::new();
        parser.apply("\x1b[5m\x1b[6;32m");
        assert_eq!(parser.style().blinks.len(), 2);

        parser.apply("\x1b[0m");
        assert!(parser.style().blinks.is_empty());
        assert_eq!(parser.style().color, None);
    }

    #[test]
    fn blink_groups_are_unique_across_resets() {
        let mut parser = SpanParser::new();
        parser.apply("\x1b[5m");
        let first = parser.style().blinks.clone();
        parser.apply("\x1b[m\x1b[5m");

        assert_ne!(first, parser.style().blinks);
    }

    #[test]
    fn reset_applies_before_later_codes_in_same_sequence() {
        let mut parser = SpanParser::new();
        parser.apply("\x1b[5;34m");
        let spans = parser.apply("\x1b[0;33mx");

        assert_eq!(spans[0].style.color, fg(StdColor::Yellow));
        assert!(spans[0].style.blinks.is_empty());
    }

    #[test]
    fn bold_promotes_active_color() {
        let mut parser = SpanParser::new();
        let spans = parser.apply("\x1b[36;1mhi");
        assert_eq!(spans[0].style.color, fg(StdColor::BrightCyan));

        parser.apply("\x1b[0;1m");
        assert_eq!(parser.style().color, None);
    }

    #[test]
    fn colors_replace_each_other() {
        let mut parser = SpanParser::new();
        parser.apply("\x1b[31m\x1b[44m");
        assert_eq!(
            parser.style().color,
            Some(StyleColor::Background(StdColor::Blue))
        );
    }

    #[test]
    fn style_carries_across_calls() {
        let mut parser = SpanParser::new();
        parser.apply("\x1b[32mgreen starts");
        let spans = parser.apply("still green");
        assert_eq!(spans[0].style.color, fg(StdColor::Green));
    }

    #[test]
    fn spans_take_style_at_emission() {
        let mut parser = SpanParser::new();
        let spans = parser.apply("a\x1b[31mb\x1b[99mc");

        let texts: Vec<_> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(spans[0].style.color, None);
        assert_eq!(spans[1].style.color, fg(StdColor::Red));
        assert_eq!(spans[2].style.color, fg(StdColor::Red));
    }

    #[test]
    fn truncated_escape_becomes_literal_text() {
        let mut parser = SpanParser::new();
        let spans = parser.apply("ok\x1b[3");

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "ok[3");
    }

    #[test]
    fn garbage_params_are_ignored() {
        let mut parser = SpanParser::new();
        let spans = parser.apply("\x1b[31;4:3;1mX");
        assert_eq!(spans[0].style.color, fg(StdColor::BrightRed));
    }

    #[test]
    fn render_marks_links_and_keeps_style() {
        let mut parser = SpanParser::new();
        let spans = parser.render("\x1b[33mgo to www.bbs.org now");

        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].text, "www.bbs.org");
        assert_eq!(spans[1].hyperlink.as_deref(), Some("http://www.bbs.org"));
        assert!(spans.iter().all(|s| s.style.color == fg(StdColor::Yellow)));
        assert!(!spans[0].is_hyperlink() && !spans[2].is_hyperlink());
    }
}
