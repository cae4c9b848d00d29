use std::fmt;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use telechat_session::{ConnectTarget, SessionSize};

use crate::logon::AutoLogon;
use crate::options::{
    ConnectionOptions, DEFAULT_ACTION_LIST_COMMAND, ProcessorOptions,
};

pub const DEFAULT_PORT: u16 = 23;

/// Persisted user preferences. Unknown or missing fields fall back to
/// defaults so older files keep loading.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub bannerless: bool,
    pub auto_logon: bool,
    /// Seconds between keep-alives, 0 disables them.
    pub keepalive_secs: u64,
    /// Empty disables the automatic request.
    pub action_list_command: String,
    pub terminal_cols: u16,
    pub terminal_rows: u16,
}

impl Default for Settings {
    fn default() -> Self {
        let size = SessionSize::default();
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: None,
            bannerless: false,
            auto_logon: false,
            keepalive_secs: 60,
            action_list_command: DEFAULT_ACTION_LIST_COMMAND.to_string(),
            terminal_cols: size.cols,
            terminal_rows: size.rows,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("bannerless", &self.bannerless)
            .field("auto_logon", &self.auto_logon)
            .field("keepalive_secs", &self.keepalive_secs)
            .field("action_list_command", &self.action_list_command)
            .field("terminal_cols", &self.terminal_cols)
            .field("terminal_rows", &self.terminal_rows)
            .finish()
    }
}

impl Settings {
    pub fn size(&self) -> SessionSize {
        SessionSize {
            rows: self.terminal_rows.max(1),
            cols: self.terminal_cols.max(1),
        }
    }

    pub fn connect_target(&self) -> ConnectTarget {
        ConnectTarget::new(self.host.clone(), self.port).with_size(self.size())
    }

    pub fn processor_options(&self) -> ProcessorOptions {
        let command = self.action_list_command.trim();
        let logon = self.auto_logon.then(|| {
            let password = self.password.clone().map(SecretString::from);
            AutoLogon::new(self.username.clone(), password)
        });

        ProcessorOptions {
            username: self.username.clone(),
            bannerless: self.bannerless,
            action_list_command: (!command.is_empty())
                .then(|| command.to_string()),
            logon,
        }
    }

    /// Point at a favorites entry, `host` or `host:port`. Returns false and
    /// leaves the settings alone when the entry is unusable.
    pub fn apply_favorite(&mut self, entry: &str) -> bool {
        let entry = entry.trim();
        let (host, port) = match entry.rsplit_once(':') {
            Some((host, port)) => match port.trim().parse::<u16>() {
                Ok(port) => (host.trim(), port),
                Err(_) => return false,
            },
            None => (entry, DEFAULT_PORT),
        };
        if host.is_empty() {
            return false;
        }

        self.host = host.to_string();
        self.port = port;
        true
    }

    /// The favorites entry for the current host, port omitted when default.
    pub fn favorite_entry(&self) -> String {
        if self.port == DEFAULT_PORT {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            keepalive: (self.keepalive_secs > 0)
                .then(|| Duration::from_secs(self.keepalive_secs)),
            ..ConnectionOptions::default()
        }
    }
}
