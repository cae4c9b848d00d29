//! Transport ownership.
//!
//! A [`Connection`] runs two helper threads. The reader owns a clone of the
//! session, blocks on reads and forwards raw chunks over a channel; nothing
//! else crosses the thread boundary. The keep-alive thread pokes the link on
//! an interval and sleeps on a cancellation channel, so disconnect wakes it
//! at once. Parsing happens on whoever drains [`Connection::try_recv`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use telechat_codec::cp437;
use telechat_session::{
    ConnectTarget, Connector, ReadOutcome, Session, SessionError, SessionSize,
};

use crate::event::ConnectionState;
use crate::options::{ConnectionOptions, ReconnectPolicy};
use crate::{Error, Result};

/// What the reader thread reports.
#[derive(Debug)]
pub enum ReaderMessage {
    Data(Vec<u8>),
    /// The remote side closed the stream.
    Closed,
    Failed(SessionError),
}

type SharedSession = Arc<Mutex<Box<dyn Session>>>;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Connection {
    writer: SharedSession,
    inbound: Receiver<ReaderMessage>,
    quit_message: String,
    state: Mutex<ConnectionState>,
    closing: AtomicBool,
    stop: Arc<AtomicBool>,
    keepalive_cancel: Mutex<Option<Sender<()>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Connection {
    /// Connect once and start the helper threads.
    pub fn open(
        connector: &dyn Connector,
        target: &ConnectTarget,
        options: ConnectionOptions,
    ) -> Result<Self> {
        let target = target.clone().with_read_timeout(options.read_timeout);
        let session = connector.connect(&target)?;
        Self::start(session, options)
    }

    /// Take over an already connected session.
    pub fn start(
        session: Box<dyn Session>,
        options: ConnectionOptions,
    ) -> Result<Self> {
        let reader = session.try_clone()?;
        let writer: SharedSession = Arc::new(Mutex::new(session));
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, inbound) = flume::unbounded();

        let mut threads = Vec::with_capacity(2);
        let capacity = options.read_buffer_capacity.max(1);
        let reader_stop = Arc::clone(&stop);
        threads.push(spawn("reader", move || {
            read_loop(reader, tx, reader_stop, capacity)
        })?);

        let mut keepalive_cancel = None;
        if let Some(interval) = options.keepalive {
            let (cancel_tx, cancel_rx) = flume::bounded::<()>(1);
            let keepalive_writer = Arc::clone(&writer);
            let spawned = spawn("keepalive", move || {
                keepalive_loop(keepalive_writer, cancel_rx, interval)
            });
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(err) => {
                    // Unblock the reader before giving up.
                    stop.store(true, Ordering::Release);
                    if let Err(close_err) = lock(&writer).close() {
                        debug!("closing session failed: {close_err}");
                    }
                    return Err(err);
                },
            }
            keepalive_cancel = Some(cancel_tx);
        }

        info!("connection established");
        Ok(Self {
            writer,
            inbound,
            quit_message: options.quit_message,
            state: Mutex::new(ConnectionState::Connected),
            closing: AtomicBool::new(false),
            stop,
            keepalive_cancel: Mutex::new(keepalive_cancel),
            threads: Mutex::new(threads),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    /// Next message from the reader, without blocking.
    pub fn try_recv(&self) -> Option<ReaderMessage> {
        self.inbound.try_recv().ok()
    }

    /// Encode `line` as CP437 and send it with a CRLF terminator.
    pub fn send_line(&self, line: &str) -> Result<()> {
        if self.closing.load(Ordering::Acquire) {
            return Err(Error::NotConnected);
        }

        let mut bytes = cp437::encode(line);
        bytes.extend_from_slice(b"\r\n");
        lock(&self.writer).write(&bytes)?;
        Ok(())
    }

    pub fn resize(&self, size: SessionSize) -> Result<()> {
        if self.closing.load(Ordering::Acquire) {
            return Err(Error::NotConnected);
        }
        lock(&self.writer).resize(size)?;
        Ok(())
    }

    /// Tear the connection down. Safe to call from several threads and
    /// more than once; only the first call does the work and returns true.
    pub fn disconnect(&self) -> bool {
        if self.closing.swap(true, Ordering::AcqRel) {
            return false;
        }

        *lock(&self.state) = ConnectionState::Disconnecting;
        self.stop.store(true, Ordering::Release);
        // Dropping the sender wakes the keep-alive thread.
        drop(lock(&self.keepalive_cancel).take());

        {
            let mut session = lock(&self.writer);
            if !self.quit_message.is_empty() {
                let mut quit = cp437::encode(&self.quit_message);
                quit.extend_from_slice(b"\r\n");
                if let Err(err) = session.write(&quit) {
                    debug!("quit message not delivered: {err}");
                }
            }
            if let Err(err) = session.close() {
                debug!("closing session failed: {err}");
            }
        }

        let threads = std::mem::take(&mut *lock(&self.threads));
        for handle in threads {
            if handle.join().is_err() {
                warn!("connection helper thread panicked");
            }
        }

        *lock(&self.state) = ConnectionState::Disconnected;
        info!("disconnected");
        true
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Connect with bounded retries, sleeping `policy.backoff` between
/// attempts.
pub fn connect_with_retry(
    connector: &dyn Connector,
    target: &ConnectTarget,
    options: ConnectionOptions,
    policy: ReconnectPolicy,
) -> Result<Connection> {
    let attempts = policy.attempts.max(1);
    let target = target.clone().with_read_timeout(options.read_timeout);

    let mut attempt = 1;
    loop {
        match connector.connect(&target) {
            Ok(session) => return Connection::start(session, options),
            Err(err) if attempt >= attempts => {
                return Err(Error::RetriesExhausted {
                    attempts,
                    last: err,
                });
            },
            Err(err) => {
                warn!(
                    "connecting to {}:{} failed (attempt {attempt}/{attempts}): \
                     {err}",
                    target.host, target.port
                );
                attempt += 1;
                thread::sleep(policy.backoff);
            },
        }
    }
}

fn spawn<F>(name: &'static str, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(format!("telechat-{name}"))
        .spawn(body)
        .map_err(|source| Error::Spawn { name, source })
}

fn read_loop(
    mut session: Box<dyn Session>,
    tx: Sender<ReaderMessage>,
    stop: Arc<AtomicBool>,
    capacity: usize,
) {
    let mut buf = vec![0u8; capacity];
    loop {
        if stop.load(Ordering::Acquire) {
            break;
        }

        let message = match session.read(&mut buf) {
            Ok(ReadOutcome::Data(n)) => ReaderMessage::Data(buf[..n].to_vec()),
            Ok(ReadOutcome::Timeout) => continue,
            Ok(ReadOutcome::Eof) => ReaderMessage::Closed,
            Err(_) if stop.load(Ordering::Acquire) => break,
            Err(err) => ReaderMessage::Failed(err),
        };

        let last = !matches!(message, ReaderMessage::Data(_));
        if stop.load(Ordering::Acquire) || tx.send(message).is_err() || last {
            break;
        }
    }
    debug!("[reader] exiting");
}

fn keepalive_loop(
    writer: SharedSession,
    cancel: Receiver<()>,
    interval: Duration,
) {
    loop {
        match cancel.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                if let Err(err) = lock(&writer).send_keepalive() {
                    debug!("[keepalive] send failed: {err}");
                }
            },
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("[keepalive] exiting");
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use telechat_session::{MemoryConnector, MemorySession};

    use super::*;

    fn options() -> ConnectionOptions {
        ConnectionOptions {
            keepalive: None,
            ..ConnectionOptions::default()
        }
    }

    fn recv(connection: &Connection) -> ReaderMessage {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(message) = connection.try_recv() {
                return message;
            }
            assert!(Instant::now() < deadline, "reader produced nothing");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn reader_forwards_chunks_then_close() {
        let session = MemorySession::new();
        session.push_read(b"hello".to_vec());
        session.push_eof();

        let connection =
            Connection::start(Box::new(session.clone()), options()).unwrap();
        assert!(matches!(
            recv(&connection),
            ReaderMessage::Data(data) if data == b"hello"
        ));
        assert!(matches!(recv(&connection), ReaderMessage::Closed));
    }

    #[test]
    fn concurrent_disconnects_send_one_quit() {
        let session = MemorySession::new();
        let connection = Arc::new(
            Connection::start(Box::new(session.clone()), options()).unwrap(),
        );

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let connection = Arc::clone(&connection);
                thread::spawn(move || connection.disconnect())
            })
            .collect();
        let performed: Vec<bool> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(performed.iter().filter(|done| **done).count(), 1);
        assert_eq!(session.written_string(), "/quit\r\n");
        assert_eq!(session.close_calls(), 1);
        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn failed_quit_write_still_disconnects() {
        let session = MemorySession::new();
        session.fail_writes(true);
        let connection =
            Connection::start(Box::new(session.clone()), options()).unwrap();

        assert!(connection.disconnect());
        assert!(session.is_closed());
        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert!(matches!(
            connection.send_line("hi"),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn keepalive_runs_until_disconnect() {
        let session = MemorySession::new();
        let connection = Connection::start(
            Box::new(session.clone()),
            ConnectionOptions {
                keepalive: Some(Duration::from_millis(5)),
                ..ConnectionOptions::default()
            },
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while session.keepalives() < 2 {
            assert!(Instant::now() < deadline, "no keep-alives sent");
            thread::sleep(Duration::from_millis(2));
        }

        connection.disconnect();
        let sent = session.keepalives();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(session.keepalives(), sent);
    }

    #[test]
    fn lines_are_cp437_encoded_with_crlf() {
        let session = MemorySession::new();
        let connection =
            Connection::start(Box::new(session.clone()), options()).unwrap();

        connection.send_line("caf\u{e9} \u{2500}").unwrap();
        assert_eq!(session.written(), b"caf\x82 \xc4\r\n");
    }

    #[test]
    fn retry_gives_up_after_policy_attempts() {
        let connector = MemoryConnector::failing(5, MemorySession::new());
        let policy = ReconnectPolicy {
            attempts: 3,
            backoff: Duration::ZERO,
        };

        let result = connect_with_retry(
            &connector,
            &ConnectTarget::new("bbs.example", 23),
            options(),
            policy,
        );
        assert!(matches!(
            result,
            Err(Error::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(connector.attempts(), 3);
    }

    #[test]
    fn retry_succeeds_after_transient_failure() {
        let connector = MemoryConnector::failing(1, MemorySession::new());
        let policy = ReconnectPolicy {
            attempts: 3,
            backoff: Duration::ZERO,
        };

        let connection = connect_with_retry(
            &connector,
            &ConnectTarget::new("bbs.example", 23),
            options(),
            policy,
        )
        .unwrap();
        assert_eq!(connection.state(), ConnectionState::Connected);
        assert_eq!(connector.attempts(), 2);
    }
}
