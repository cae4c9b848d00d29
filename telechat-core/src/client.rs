use std::time::Instant;

use log::{info, warn};

use telechat_session::{ConnectTarget, Connector, SessionSize};

use crate::connection::{Connection, ReaderMessage, connect_with_retry};
use crate::event::{ConnectionState, DisplayEvent};
use crate::options::{ConnectionOptions, ReconnectPolicy};
use crate::processor::StreamProcessor;
use crate::{Error, Result};

/// Single consumer that owns the processor and the connection.
///
/// Front-ends call [`Client::tick`] on a fixed interval. Each tick drains
/// everything the reader thread queued, runs it through the processor and
/// writes whatever the processor wants sent.
pub struct Client {
    processor: StreamProcessor,
    connection: Option<Connection>,
    pending: Vec<DisplayEvent>,
    state: ConnectionState,
}

impl Client {
    pub fn new(processor: StreamProcessor) -> Self {
        Self {
            processor,
            connection: None,
            pending: Vec::new(),
            state: ConnectionState::Disconnected,
        }
    }

    pub fn processor(&self) -> &StreamProcessor {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut StreamProcessor {
        &mut self.processor
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Connect, replacing any current connection. Parsing state starts
    /// fresh.
    pub fn connect(
        &mut self,
        connector: &dyn Connector,
        target: &ConnectTarget,
        options: ConnectionOptions,
        policy: ReconnectPolicy,
    ) -> Result<()> {
        self.disconnect();
        self.processor.reset();
        self.set_state(ConnectionState::Connecting);
        info!("connecting to {}:{}", target.host, target.port);

        match connect_with_retry(connector, target, options, policy) {
            Ok(connection) => {
                self.connection = Some(connection);
                self.set_state(ConnectionState::Connected);
                Ok(())
            },
            Err(err) => {
                self.pending.push(DisplayEvent::Status(err.to_string()));
                self.set_state(ConnectionState::Disconnected);
                Err(err)
            },
        }
    }

    /// Drain inbound data and timers. Returns events in stream order.
    pub fn tick(&mut self, now: Instant) -> Vec<DisplayEvent> {
        let mut events = std::mem::take(&mut self.pending);

        let mut lost = None;
        if let Some(connection) = &self.connection {
            while let Some(message) = connection.try_recv() {
                match message {
                    ReaderMessage::Data(bytes) => {
                        events.extend(self.processor.feed_at(&bytes, now));
                    },
                    ReaderMessage::Closed => {
                        lost = Some("connection closed by remote".to_string());
                        break;
                    },
                    ReaderMessage::Failed(err) => {
                        lost = Some(format!("connection lost: {err}"));
                        break;
                    },
                }
            }
        }

        self.processor.poll_timers(now);
        self.flush_outbound();

        if let Some(reason) = lost {
            warn!("{reason}");
            self.pending.push(DisplayEvent::Status(reason));
            self.disconnect();
        }

        events.append(&mut self.pending);
        events
    }

    /// Send a line typed by the user.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        let connection = self.connection.as_ref().ok_or(Error::NotConnected)?;
        connection.send_line(line)
    }

    pub fn request_action_list(&mut self) {
        if self.processor.request_action_list() {
            self.flush_outbound();
        }
    }

    pub fn resize(&mut self, size: SessionSize) -> Result<()> {
        let connection = self.connection.as_ref().ok_or(Error::NotConnected)?;
        connection.resize(size)
    }

    /// Run the disconnect sequence if connected.
    pub fn disconnect(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        self.set_state(ConnectionState::Disconnecting);
        connection.disconnect();
        self.processor.reset();
        self.set_state(ConnectionState::Disconnected);
    }

    fn flush_outbound(&mut self) {
        let outbound = self.processor.take_outbound();
        let Some(connection) = &self.connection else {
            return;
        };

        for line in outbound {
            if let Err(err) = connection.send_line(line.expose()) {
                warn!("failed to send queued line: {err}");
                self.pending.push(DisplayEvent::Status(err.to_string()));
                break;
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            self.state = state;
            self.pending.push(DisplayEvent::ConnectionStateChanged(state));
        }
    }
}
