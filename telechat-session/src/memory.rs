//! Scripted in-memory session.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::{
    ConnectTarget, Connector, ReadOutcome, Session, SessionError, SessionSize,
};

/// How long an empty read pretends to wait before timing out.
const IDLE_READ: Duration = Duration::from_millis(5);

#[derive(Debug)]
enum Chunk {
    Data(Vec<u8>),
    Failure(io::ErrorKind),
    Eof,
}

#[derive(Debug, Default)]
struct MemoryState {
    reads: VecDeque<Chunk>,
    written: Vec<u8>,
    closed: bool,
    close_calls: usize,
    keepalives: usize,
    fail_writes: bool,
    size: Option<SessionSize>,
}

/// A session whose inbound bytes are queued by the test and whose outbound
/// bytes are recorded. Clones share the same state, so the test keeps one
/// handle while the code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue bytes for a later read.
    pub fn push_read(&self, bytes: impl Into<Vec<u8>>) {
        self.lock().reads.push_back(Chunk::Data(bytes.into()));
    }

    /// Queue end of stream. Every read after it reports EOF.
    pub fn push_eof(&self) {
        self.lock().reads.push_back(Chunk::Eof);
    }

    /// Queue a read error.
    pub fn push_failure(&self, kind: io::ErrorKind) {
        self.lock().reads.push_back(Chunk::Failure(kind));
    }

    /// Make every following write fail with a broken pipe.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.lock().written).into_owned()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    pub fn keepalives(&self) -> usize {
        self.lock().keepalives
    }

    /// Last size reported through [`Session::resize`].
    pub fn size(&self) -> Option<SessionSize> {
        self.lock().size
    }
}

impl Session for MemorySession {
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, SessionError> {
        let mut state = self.lock();
        if state.closed {
            return Ok(ReadOutcome::Eof);
        }

        match state.reads.pop_front() {
            Some(Chunk::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    let rest = bytes.split_off(n);
                    state.reads.push_front(Chunk::Data(rest));
                }
                Ok(ReadOutcome::Data(n))
            },
            Some(Chunk::Failure(kind)) => {
                Err(SessionError::IO(io::Error::from(kind)))
            },
            Some(Chunk::Eof) => {
                state.reads.push_front(Chunk::Eof);
                Ok(ReadOutcome::Eof)
            },
            None => {
                drop(state);
                thread::sleep(IDLE_READ);
                Ok(ReadOutcome::Timeout)
            },
        }
    }

    fn write(&mut self, input: &[u8]) -> Result<usize, SessionError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(SessionError::IO(io::Error::from(
                io::ErrorKind::BrokenPipe,
            )));
        }
        if state.closed {
            return Err(SessionError::Closed);
        }
        state.written.extend_from_slice(input);
        Ok(input.len())
    }

    fn send_keepalive(&mut self) -> Result<(), SessionError> {
        let mut state = self.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        state.keepalives += 1;
        Ok(())
    }

    fn resize(&mut self, size: SessionSize) -> Result<(), SessionError> {
        self.lock().size = Some(size);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        let mut state = self.lock();
        state.closed = true;
        state.close_calls += 1;
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn Session>, SessionError> {
        Ok(Box::new(self.clone()))
    }
}

/// Hands out clones of one [`MemorySession`], optionally failing the first
/// few attempts.
#[derive(Debug)]
pub struct MemoryConnector {
    session: MemorySession,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl MemoryConnector {
    pub fn new(session: MemorySession) -> Self {
        Self::failing(0, session)
    }

    /// Refuse the first `failures` connection attempts.
    pub fn failing(failures: usize, session: MemorySession) -> Self {
        Self {
            session,
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }
}

impl Connector for MemoryConnector {
    fn connect(
        &self,
        target: &ConnectTarget,
    ) -> Result<Box<dyn Session>, SessionError> {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        let refused = self
            .failures_left
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                left.checked_sub(1)
            })
            .is_ok();
        if refused {
            return Err(SessionError::IO(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            )));
        }

        let mut session = self.session.clone();
        session.resize(target.size)?;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_split_to_buffer_size() {
        let session = MemorySession::new();
        session.push_read(b"abcdef".to_vec());
        session.push_eof();

        let mut reader = session.clone();
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), ReadOutcome::Data(4));
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.read(&mut buf).unwrap(), ReadOutcome::Data(2));
        assert_eq!(reader.read(&mut buf).unwrap(), ReadOutcome::Eof);
        assert_eq!(reader.read(&mut buf).unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn empty_queue_times_out() {
        let mut session = MemorySession::new();
        let mut buf = [0u8; 4];
        assert_eq!(session.read(&mut buf).unwrap(), ReadOutcome::Timeout);
    }

    #[test]
    fn writes_are_recorded_until_closed() {
        let session = MemorySession::new();
        let mut writer = session.try_clone().unwrap();
        writer.write(b"hi\r\n").unwrap();
        writer.close().unwrap();

        assert_eq!(session.written(), b"hi\r\n");
        assert!(matches!(writer.write(b"x"), Err(SessionError::Closed)));
        assert_eq!(session.close_calls(), 1);
    }

    #[test]
    fn connector_fails_requested_attempts() {
        let connector = MemoryConnector::failing(2, MemorySession::new());
        let target = ConnectTarget::new("bbs.example", 23);

        assert!(connector.connect(&target).is_err());
        assert!(connector.connect(&target).is_err());
        assert!(connector.connect(&target).is_ok());
        assert_eq!(connector.attempts(), 3);
    }
}
