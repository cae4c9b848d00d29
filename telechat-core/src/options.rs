use std::time::Duration;

use crate::logon::AutoLogon;

/// Command sent after the first banner of a connection.
pub const DEFAULT_ACTION_LIST_COMMAND: &str = "/action list";

/// Configuration knobs for [`crate::StreamProcessor`].
#[derive(Debug)]
pub struct ProcessorOptions {
    /// Local user name, used to decide whether chat is directed at us.
    pub username: String,
    /// Hide banner lines from display while still parsing them.
    pub bannerless: bool,
    /// `None` disables the automatic action-list request.
    pub action_list_command: Option<String>,
    pub logon: Option<AutoLogon>,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            username: String::new(),
            bannerless: false,
            action_list_command: Some(DEFAULT_ACTION_LIST_COMMAND.to_string()),
            logon: None,
        }
    }
}

/// Configuration knobs for [`crate::Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// How long one transport read may block before it is retried.
    pub read_timeout: Duration,
    /// Size of the buffer the reader thread drains the transport into.
    pub read_buffer_capacity: usize,
    /// `None` disables keep-alives.
    pub keepalive: Option<Duration>,
    /// Sent best effort before the transport is closed. Empty sends nothing.
    pub quit_message: String,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(200),
            read_buffer_capacity: 4096,
            keepalive: Some(Duration::from_secs(60)),
            quit_message: String::from("/quit"),
        }
    }
}

/// Bounded retry around connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}
