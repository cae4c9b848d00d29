use std::time::Duration;

use crate::{SessionError, SessionSize};

/// Result of a single read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes of payload were written into the buffer.
    Data(usize),
    /// The read timeout elapsed with nothing to deliver. Not an error.
    Timeout,
    /// The remote side closed the stream.
    Eof,
}

/// Duplex byte stream to a remote system.
///
/// Reads block for at most the session's read timeout. A session can be
/// cloned into a second handle sharing the same stream, which lets one
/// thread read while another writes.
pub trait Session: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, SessionError>;

    fn write(&mut self, input: &[u8]) -> Result<usize, SessionError>;

    /// Send whatever the protocol uses to keep an idle link open.
    fn send_keepalive(&mut self) -> Result<(), SessionError>;

    fn resize(&mut self, size: SessionSize) -> Result<(), SessionError>;

    fn close(&mut self) -> Result<(), SessionError>;

    fn try_clone(&self) -> Result<Box<dyn Session>, SessionError>;
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub size: SessionSize,
    pub read_timeout: Duration,
}

impl ConnectTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            size: SessionSize::default(),
            read_timeout: Duration::from_millis(200),
        }
    }

    pub fn with_size(mut self, size: SessionSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Opens sessions. Kept separate from [`Session`] so reconnect logic can be
/// exercised without a network.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        target: &ConnectTarget,
    ) -> Result<Box<dyn Session>, SessionError>;
}
