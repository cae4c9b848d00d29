use std::fmt;

use crate::color::StdColor;

/// The single color tag a span can carry.
///
/// Foreground and background tags share one slot: a newer SGR color code
/// always replaces the older one, whichever plane it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleColor {
    Foreground(StdColor),
    Background(StdColor),
}

impl StyleColor {
    /// Bold promotion. Only base foreground colors have a bright variant.
    pub(crate) fn to_bright(self) -> Self {
        match self {
            Self::Foreground(color) => Self::Foreground(color.to_bright()),
            background => background,
        }
    }
}

/// Identifier of one blink group allocated by [`crate::SpanParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlinkGroup(pub u32);

impl fmt::Display for BlinkGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blink{}", self.0)
    }
}

/// Rendering attributes active at a point in the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StyleState {
    /// `None` means the presentation default color.
    pub color: Option<StyleColor>,
    /// Blink groups in allocation order.
    pub blinks: Vec<BlinkGroup>,
}

impl StyleState {
    pub fn is_default(&self) -> bool {
        self.color.is_none() && self.blinks.is_empty()
    }

    pub fn is_blinking(&self) -> bool {
        !self.blinks.is_empty()
    }

    pub(crate) fn reset(&mut self) {
        self.color = None;
        self.blinks.clear();
    }
}
