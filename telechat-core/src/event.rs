use std::collections::BTreeSet;
use std::fmt;

use telechat_codec::TextSpan;

use crate::classifier::ChatEvent;

/// Name of the member every room snapshot carries.
pub const SYSTEM_MEMBER: &str = "system";

/// Room occupancy parsed from a completed banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub room: Option<String>,
    pub topic: Option<String>,
    /// Sorted and deduplicated. Always contains [`SYSTEM_MEMBER`].
    pub members: BTreeSet<String>,
}

impl RoomSnapshot {
    pub fn new(room: Option<String>, topic: Option<String>) -> Self {
        let mut members = BTreeSet::new();
        members.insert(SYSTEM_MEMBER.to_string());
        Self {
            room,
            topic,
            members,
        }
    }

    /// Members other than the synthetic one.
    pub fn visible_members(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .map(String::as_str)
            .filter(|member| *member != SYSTEM_MEMBER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
        };
        f.write_str(label)
    }
}

/// Everything the presentation layer is told, in stream order.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    /// A complete line ready for display.
    RenderLine { spans: Vec<TextSpan> },
    /// Preview of the not yet terminated tail of the stream, such as a
    /// prompt. Superseded by the next `PartialLine` or `RenderLine`.
    PartialLine { spans: Vec<TextSpan> },
    RoomSnapshot(RoomSnapshot),
    /// Sorted action verbs offered by the remote system.
    ActionVocabulary(Vec<String>),
    Chat(ChatEvent),
    ConnectionStateChanged(ConnectionState),
    /// Human readable status, e.g. a transport failure.
    Status(String),
}
