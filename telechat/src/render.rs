use std::io::{self, Write};
use std::time::Instant;

use telechat_core::codec::{BlinkTimer, StdColor, StyleColor, TextSpan};
use telechat_core::{ChatEvent, ConnectionState, DisplayEvent, RoomSnapshot};

const CLEAR_LINE: &str = "\r\x1b[K";
const RESET: &str = "\x1b[0m";

/// Writes display events to an ANSI terminal, one line at a time.
///
/// The unterminated line is kept on screen and redrawn in place, so a
/// prompt stays visible until the remote side finishes it.
pub struct Renderer<W: Write> {
    out: W,
    username: String,
    partial: Vec<TextSpan>,
    blink: BlinkTimer,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, username: impl Into<String>, now: Instant) -> Self {
        Self {
            out,
            username: username.into(),
            partial: Vec::new(),
            blink: BlinkTimer::new(now),
        }
    }

    pub fn render(&mut self, event: &DisplayEvent) -> io::Result<()> {
        match event {
            DisplayEvent::RenderLine { spans } => {
                self.partial.clear();
                let line = spans_to_ansi(spans, true);
                write!(self.out, "{CLEAR_LINE}{line}\r\n")?;
            },
            DisplayEvent::PartialLine { spans } => {
                self.partial = spans.clone();
                self.redraw_partial()?;
            },
            DisplayEvent::RoomSnapshot(snapshot) => {
                let line = describe_room(snapshot);
                self.status(&line)?;
            },
            DisplayEvent::ActionVocabulary(words) => {
                self.status(&format!("{} actions available", words.len()))?;
            },
            DisplayEvent::Chat(chat) => self.chat(chat)?,
            DisplayEvent::ConnectionStateChanged(state) => {
                self.connection_state(*state)?;
            },
            DisplayEvent::Status(text) => self.status(text)?,
        }
        self.out.flush()
    }

    /// Redraw the pending line when its blinking text changes phase.
    pub fn tick(&mut self, now: Instant) -> io::Result<()> {
        if self.blink.tick(now).is_none() {
            return Ok(());
        }
        if self.partial.iter().any(|span| span.style.is_blinking()) {
            self.redraw_partial()?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn redraw_partial(&mut self) -> io::Result<()> {
        let line = spans_to_ansi(&self.partial, self.blink.visible());
        write!(self.out, "{CLEAR_LINE}{line}")
    }

    fn chat(&mut self, chat: &ChatEvent) -> io::Result<()> {
        if chat.is_directed_at(&self.username) {
            // Bell on messages meant for us.
            write!(self.out, "\x07")?;
        }
        Ok(())
    }

    fn connection_state(&mut self, state: ConnectionState) -> io::Result<()> {
        if state == ConnectionState::Disconnected {
            self.partial.clear();
        }
        self.status(&state.to_string())
    }

    fn status(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{CLEAR_LINE}\x1b[90m*** {text}{RESET}\r\n")?;
        if !self.partial.is_empty() {
            self.redraw_partial()?;
        }
        Ok(())
    }
}

fn describe_room(snapshot: &RoomSnapshot) -> String {
    let room = snapshot.room.as_deref().unwrap_or("unknown room");
    let members: Vec<&str> = snapshot.visible_members().collect();
    let mut line = format!("room: {room}");
    if let Some(topic) = &snapshot.topic {
        line.push_str(&format!(" ({topic})"));
    }
    if !members.is_empty() {
        line.push_str(&format!(", with {}", members.join(", ")));
    }
    line
}

/// Render spans as SGR-decorated text. Blinking spans become blanks when
/// `blink_visible` is false.
pub fn spans_to_ansi(spans: &[TextSpan], blink_visible: bool) -> String {
    let mut out = String::new();
    for span in spans {
        let mut codes = Vec::new();
        if let Some(color) = span.style.color {
            codes.push(color_code(color));
        }
        if span.is_hyperlink() {
            codes.push(4);
        }

        if codes.is_empty() {
            out.push_str(&visible_text(span, blink_visible));
            continue;
        }

        let params: Vec<String> =
            codes.iter().map(ToString::to_string).collect();
        out.push_str(&format!("\x1b[{}m", params.join(";")));
        out.push_str(&visible_text(span, blink_visible));
        out.push_str(RESET);
    }
    out
}

fn visible_text(span: &TextSpan, blink_visible: bool) -> String {
    if blink_visible || !span.style.is_blinking() {
        return span.text.clone();
    }
    " ".repeat(span.text.chars().count())
}

fn color_code(color: StyleColor) -> u8 {
    match color {
        StyleColor::Foreground(color) => plane_code(color, 30, 90),
        StyleColor::Background(color) => plane_code(color, 40, 100),
    }
}

fn plane_code(color: StdColor, base: u8, bright: u8) -> u8 {
    let index = color as u8;
    if color.is_bright() {
        bright + index - 8
    } else {
        base + index
    }
}
