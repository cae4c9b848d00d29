//! Byte- and text-level building blocks for BBS teleconference streams.
//!
//! Everything in this crate is synchronous and total: any byte sequence
//! decodes, any text splits into spans, and malformed escapes degrade into
//! literal text instead of errors.
//!
//! - [`cp437`] maps the legacy PC code page to Unicode and back.
//! - [`LineAssembler`] turns arbitrarily chunked text into complete lines.
//! - [`SpanParser`] walks SGR escapes and produces styled [`TextSpan`]s.
//! - [`hyperlink`] splits text into plain and link segments.

pub mod cp437;
pub mod hyperlink;

mod blink;
mod color;
mod escape;
mod line;
mod span;
mod style;

pub use blink::{BLINK_INTERVAL, BlinkTimer, MIN_BLINK_INTERVAL};
pub use color::StdColor;
pub use escape::strip;
pub use hyperlink::{Segment, extract_urls};
pub use line::LineAssembler;
pub use span::{SpanParser, TextSpan};
pub use style::{BlinkGroup, StyleColor, StyleState};
