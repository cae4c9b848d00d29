/// The eight ANSI base colors plus their bright variants.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum StdColor {
    Black = 0,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl StdColor {
    /// Bright variant of a base color. Bright colors map to themselves.
    pub fn to_bright(self) -> Self {
        match self {
            Self::Black => Self::BrightBlack,
            Self::Red => Self::BrightRed,
            Self::Green => Self::BrightGreen,
            Self::Yellow => Self::BrightYellow,
            Self::Blue => Self::BrightBlue,
            Self::Magenta => Self::BrightMagenta,
            Self::Cyan => Self::BrightCyan,
            Self::White => Self::BrightWhite,
            val => val,
        }
    }

    pub fn is_bright(self) -> bool {
        self >= Self::BrightBlack
    }

    /// Lowercase tag name, e.g. `bright_red`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
            Self::BrightBlack => "bright_black",
            Self::BrightRed => "bright_red",
            Self::BrightGreen => "bright_green",
            Self::BrightYellow => "bright_yellow",
            Self::BrightBlue => "bright_blue",
            Self::BrightMagenta => "bright_magenta",
            Self::BrightCyan => "bright_cyan",
            Self::BrightWhite => "bright_white",
        }
    }
}

pub(crate) fn standard_color(code: u16) -> Option<StdColor> {
    match code {
        30 => Some(StdColor::Black),
        31 => Some(StdColor::Red),
        32 => Some(StdColor::Green),
        33 => Some(StdColor::Yellow),
        34 => Some(StdColor::Blue),
        35 => Some(StdColor::Magenta),
        36 => Some(StdColor::Cyan),
        37 => Some(StdColor::White),
        _ => None,
    }
}

pub(crate) fn bright_color(code: u16) -> Option<StdColor> {
    match code {
        90 => Some(StdColor::BrightBlack),
        91 => Some(StdColor::BrightRed),
        92 => Some(StdColor::BrightGreen),
        93 => Some(StdColor::BrightYellow),
        94 => Some(StdColor::BrightBlue),
        95 => Some(StdColor::BrightMagenta),
        96 => Some(StdColor::BrightCyan),
        97 => Some(StdColor::BrightWhite),
        _ => None,
    }
}
