//! Telnet over TCP.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use log::{debug, info};

use crate::negotiation::{IAC, NOP, TelnetFilter, escape_iac, naws_payload};
use crate::{
    ConnectTarget, Connector, ReadOutcome, Session, SessionError, SessionSize,
};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// State shared by every handle cloned from one connection.
#[derive(Debug)]
struct Shared {
    naws: AtomicBool,
    size: AtomicU32,
}

/// Telnet session. Negotiation replies are written from whichever handle
/// performs the reads.
pub struct TelnetSession {
    stream: TcpStream,
    filter: TelnetFilter,
    shared: Arc<Shared>,
    scratch: Vec<u8>,
}

impl TelnetSession {
    fn new(stream: TcpStream, shared: Arc<Shared>) -> Self {
        Self {
            stream,
            filter: TelnetFilter::default(),
            shared,
            scratch: Vec::new(),
        }
    }

    fn size(&self) -> SessionSize {
        SessionSize::unpack(self.shared.size.load(Ordering::Acquire))
    }
}

impl Session for TelnetSession {
    /// Read payload bytes, answering any negotiation in between. A read that
    /// only carried negotiation keeps waiting for payload.
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, SessionError> {
        self.scratch.resize(buf.len(), 0);
        loop {
            let n = match self.stream.read(&mut self.scratch) {
                Ok(0) => return Ok(ReadOutcome::Eof),
                Ok(n) => n,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue;
                },
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(ReadOutcome::Timeout);
                },
                Err(err) => return Err(SessionError::IO(err)),
            };

            let size = self.size();
            let filtered = self.filter.advance(&self.scratch[..n], size);
            if filtered.naws_enabled {
                self.shared.naws.store(true, Ordering::Release);
            }
            if !filtered.replies.is_empty() {
                self.stream.write_all(&filtered.replies)?;
            }
            if filtered.data.is_empty() {
                continue;
            }

            buf[..filtered.data.len()].copy_from_slice(&filtered.data);
            return Ok(ReadOutcome::Data(filtered.data.len()));
        }
    }

    fn write(&mut self, input: &[u8]) -> Result<usize, SessionError> {
        self.stream.write_all(&escape_iac(input))?;
        self.stream.flush()?;
        Ok(input.len())
    }

    fn send_keepalive(&mut self) -> Result<(), SessionError> {
        self.stream.write_all(&[IAC, NOP])?;
        Ok(())
    }

    /// Record the new size and report it if NAWS was negotiated.
    fn resize(&mut self, size: SessionSize) -> Result<(), SessionError> {
        self.shared.size.store(size.pack(), Ordering::Release);
        if self.shared.naws.load(Ordering::Acquire) {
            self.stream.write_all(&naws_payload(size))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(SessionError::IO(err)),
        }
    }

    fn try_clone(&self) -> Result<Box<dyn Session>, SessionError> {
        let stream = self.stream.try_clone()?;
        Ok(Box::new(TelnetSession::new(stream, Arc::clone(&self.shared))))
    }
}

/// Opens [`TelnetSession`]s over TCP.
#[derive(Debug, Clone)]
pub struct TelnetConnector {
    connect_timeout: Duration,
}

/// Create a connector with default timeouts.
pub fn telnet() -> TelnetConnector {
    TelnetConnector {
        connect_timeout: DEFAULT_CONNECT_TIMEOUT,
    }
}

impl TelnetConnector {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Connector for TelnetConnector {
    fn connect(
        &self,
        target: &ConnectTarget,
    ) -> Result<Box<dyn Session>, SessionError> {
        let addrs = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|_| SessionError::HostResolution(target.host.clone()))?;

        let mut last_err = None;
        for addr in addrs {
            debug!("[telnet] trying {addr}");
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(target.read_timeout))?;
                    stream.set_nodelay(true)?;
                    info!("connected to {}:{}", target.host, target.port);

                    let shared = Arc::new(Shared {
                        naws: AtomicBool::new(false),
                        size: AtomicU32::new(target.size.pack()),
                    });
                    return Ok(Box::new(TelnetSession::new(stream, shared)));
                },
                Err(err) => last_err = Some(err),
            }
        }

        Err(match last_err {
            Some(err) => SessionError::IO(err),
            None => SessionError::HostResolution(target.host.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    #[test]
    fn telnet_session_filters_negotiation_and_escapes_writes() {
        let listener = match TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener,
            Err(err) => {
                eprintln!("skipping test; cannot bind loopback: {err}");
                return;
            },
        };
        let port = listener.local_addr().expect("local addr").port();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().expect("accept");
            socket.write_all(&[IAC, 251, 1]).expect("send WILL ECHO");
            socket.write_all(b"Welcome\r\n").expect("send banner");

            let mut received = Vec::new();
            let mut buf = [0u8; 64];
            while received.len() < 6 {
                let n = socket.read(&mut buf).expect("read client");
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            received
        });

        let target = ConnectTarget::new("127.0.0.1", port)
            .with_read_timeout(Duration::from_millis(500));
        let mut session = telnet().connect(&target).expect("connect");

        let mut buf = [0u8; 64];
        let mut payload = Vec::new();
        while payload.len() < 9 {
            match session.read(&mut buf).expect("read") {
                ReadOutcome::Data(n) => payload.extend_from_slice(&buf[..n]),
                ReadOutcome::Timeout => continue,
                ReadOutcome::Eof => break,
            }
        }
        assert_eq!(payload, b"Welcome\r\n");

        session.write(&[b'h', IAC, b'i']).expect("write");
        let received = server.join().expect("server thread");
        // DO ECHO reply followed by the escaped payload.
        assert_eq!(received, [IAC, 253, 1, b'h', IAC, IAC]);
        session.close().expect("close");
    }
}
