//! Escape sequence tokenizer.
//!
//! Splits decoded text into printable runs and escape sequences. Only SGR
//! sequences carry meaning downstream; cursor movement, OSC strings and
//! two-byte escapes are recognized so they can be dropped from the display
//! text. The tokenizer never fails: a sequence that is cut off or broken by
//! an unexpected byte comes back as [`Token::Malformed`] so the caller can
//! show it as literal text.

use log::debug;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Text between escapes. May still contain stray C0 controls.
    Text(&'a str),
    /// Parameter bytes of an `ESC [ ... m` sequence.
    Sgr(&'a str),
    /// Any other complete escape sequence.
    Control,
    /// Truncated or broken sequence, without its leading `ESC`.
    Malformed(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Escape,
    CsiParam,
    CsiIntermediate,
    EscapeIntermediate,
    OscString,
}

pub(crate) struct Tokens<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Walk one escape sequence starting at `start` (which holds `ESC`).
    fn escape(&mut self, start: usize) -> Token<'a> {
        let input = self.input;
        let bytes = input.as_bytes();
        let mut state = State::Escape;
        let mut params_start = start + 2;
        let mut private = false;
        let mut idx = start + 1;

        while idx < bytes.len() {
            let byte = bytes[idx];
            match (state, byte) {
                (State::Escape, b'[') => {
                    state = State::CsiParam;
                    params_start = idx + 1;
                },
                (State::Escape, b']') => state = State::OscString,
                (State::Escape, 0x20..=0x2f) => {
                    state = State::EscapeIntermediate
                },
                (State::Escape | State::EscapeIntermediate, 0x30..=0x7e) => {
                    self.pos = idx + 1;
                    return Token::Control;
                },
                (State::EscapeIntermediate, 0x20..=0x2f) => {},
                (State::CsiParam, 0x30..=0x3f) => {
                    if idx == params_start && matches!(byte, b'<'..=b'?') {
                        private = true;
                    }
                },
                (State::CsiParam | State::CsiIntermediate, 0x20..=0x2f) => {
                    state = State::CsiIntermediate
                },
                (State::CsiParam, b'm') if !private => {
                    self.pos = idx + 1;
                    return Token::Sgr(&input[params_start..idx]);
                },
                (State::CsiParam | State::CsiIntermediate, 0x40..=0x7e) => {
                    self.pos = idx + 1;
                    return Token::Control;
                },
                (State::OscString, BEL) => {
                    self.pos = idx + 1;
                    return Token::Control;
                },
                (State::OscString, ESC)
                    if bytes.get(idx + 1) == Some(&b'\\') =>
                {
                    self.pos = idx + 2;
                    return Token::Control;
                },
                (State::OscString, _) => {},
                _ => {
                    debug!("[malformed escape] unexpected byte {byte:#04x}");
                    self.pos = idx;
                    return Token::Malformed(&input[start + 1..idx]);
                },
            }
            idx += 1;
        }

        self.pos = bytes.len();
        match state {
            // An unterminated OSC string is never shown.
            State::OscString => Token::Control,
            _ => Token::Malformed(&input[start + 1..]),
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.input.len() {
            return None;
        }

        let input = self.input;
        let rest = &input.as_bytes()[self.pos..];
        match memchr::memchr(ESC, rest) {
            Some(0) => Some(self.escape(self.pos)),
            Some(offset) => {
                let text = &input[self.pos..self.pos + offset];
                self.pos += offset;
                Some(Token::Text(text))
            },
            None => {
                let text = &input[self.pos..];
                self.pos = input.len();
                Some(Token::Text(text))
            },
        }
    }
}

/// Append `text` to `out`, dropping C0 controls. Tabs become spaces.
pub(crate) fn push_printable(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '\t' => out.push(' '),
            c if c.is_control() => {},
            c => out.push(c),
        }
    }
}

/// Remove every escape sequence and control character from `text`.
///
/// The result is the "clean" form of a line that pattern matching works on.
pub fn strip(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for token in Tokens::new(text) {
        match token {
            Token::Text(text) | Token::Malformed(text) => {
                push_printable(&mut out, text)
            },
            Token::Sgr(_) | Token::Control => {},
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        Tokens::new(input).collect()
    }

    #[test]
    fn splits_text_and_sgr() {
        assert_eq!(
            tokens("a\x1b[1;31mb"),
            vec![Token::Text("a"), Token::Sgr("1;31"), Token::Text("b")]
        );
    }

    #[test]
    fn empty_sgr_params() {
        assert_eq!(tokens("\x1b[m"), vec![Token::Sgr("")]);
    }

    #[test]
    fn cursor_and_private_sequences_are_controls() {
        assert_eq!(
            tokens("\x1b[2J\x1b[?25lx\x1b[>1m"),
            vec![
                Token::Control,
                Token::Control,
                Token::Text("x"),
                Token::Control
            ]
        );
    }

    #[test]
    fn osc_terminated_by_bel_or_st() {
        assert_eq!(
            tokens("\x1b]0;title\x07a\x1b]2;t\x1b\\b"),
            vec![
                Token::Control,
                Token::Text("a"),
                Token::Control,
                Token::Text("b")
            ]
        );
    }

    #[test]
    fn truncated_sequence_is_malformed() {
        assert_eq!(
            tokens("hi\x1b[31"),
            vec![Token::Text("hi"), Token::Malformed("[31")]
        );
        assert_eq!(tokens("\x1b"), vec![Token::Malformed("")]);
    }

    #[test]
    fn broken_sequence_resumes_at_offending_byte() {
        assert_eq!(
            tokens("\x1b[3\u{e9}x"),
            vec![Token::Malformed("[3"), Token::Text("\u{e9}x")]
        );
    }

    #[test]
    fn strip_removes_escapes_and_controls() {
        assert_eq!(
            strip("\x1b[1;33mHello\x07\x1b[0m\tworld\x1b[K"),
            "Hello world"
        );
    }
}
