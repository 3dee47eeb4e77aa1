//! Connection lifecycle for sharing strokes with peers.
//!
//! [`Connection`] is a small state machine over a [`Transport`]. The
//! transport reports what happens through a sink supplied at construction;
//! the owner feeds those [`ConnectionEvent`]s back into [`Connection::handle`]
//! on its own thread, which applies the transition and decodes inbound frames.

use crate::protocol::{DecodeError, WireMessage, decode, encode};
use crate::transport::{Transport, TransportError, TransportEvent};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Sync errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Connection already {0}")]
    AlreadyActive(ConnectionState),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A transport event tagged with the connect cycle that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEvent {
    pub epoch: u64,
    pub event: TransportEvent,
}

/// Where tagged transport events are posted. Called from transport threads.
pub type ConnectionSink = Arc<dyn Fn(ConnectionEvent) + Send + Sync + 'static>;

/// Outcome of handling a [`ConnectionEvent`].
#[derive(Debug)]
pub enum ConnectionUpdate {
    /// The state changed.
    StateChanged(ConnectionState),
    /// A message arrived and decoded cleanly.
    Received(WireMessage),
    /// A frame arrived but could not be decoded; it has been dropped.
    DecodeFailed(DecodeError),
}

/// Connection state machine over a transport.
pub struct Connection<T: Transport> {
    transport: T,
    url: String,
    state: ConnectionState,
    epoch: u64,
    sink: ConnectionSink,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, url: impl Into<String>, sink: ConnectionSink) -> Self {
        Self {
            transport,
            url: url.into(),
            state: ConnectionState::Disconnected,
            epoch: 0,
            sink,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Identifier of the current connect cycle.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Change the address used by the next `connect`.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Start connecting. Only valid while disconnected.
    pub fn connect(&mut self) -> Result<(), SyncError> {
        if self.state != ConnectionState::Disconnected {
            log::warn!("Connect ignored, connection is {}", self.state);
            return Err(SyncError::AlreadyActive(self.state));
        }

        self.epoch += 1;
        let epoch = self.epoch;
        let sink = Arc::clone(&self.sink);
        log::info!("Connecting to {}", self.url);
        self.state = ConnectionState::Connecting;

        let result = self.transport.open(
            &self.url,
            Box::new(move |event| sink(ConnectionEvent { epoch, event })),
        );
        if let Err(e) = result {
            log::error!("Failed to open connection to {}: {}", self.url, e);
            self.disconnect();
            return Err(e.into());
        }
        Ok(())
    }

    /// Close the connection from any state. Safe to repeat.
    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            log::info!("Disconnecting from {}", self.url);
        }
        self.transport.close();
        self.state = ConnectionState::Disconnected;
        // Anything the old connection still reports is now stale.
        self.epoch += 1;
    }

    /// Send a message. Returns `false` when not connected or the transport
    /// refused it.
    pub fn send(&mut self, message: &WireMessage) -> bool {
        if self.state != ConnectionState::Connected {
            log::trace!("Not sent, connection is {}", self.state);
            return false;
        }
        match self.transport.send(encode(message)) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Send failed: {}", e);
                false
            }
        }
    }

    /// Apply a transport event. Events from an earlier connect cycle are
    /// ignored.
    pub fn handle(&mut self, event: ConnectionEvent) -> Option<ConnectionUpdate> {
        if event.epoch != self.epoch {
            log::debug!("Ignoring stale event from connection #{}", event.epoch);
            return None;
        }

        match event.event {
            TransportEvent::Opened => {
                if self.state != ConnectionState::Connecting {
                    return None;
                }
                log::info!("Connected to {}", self.url);
                self.state = ConnectionState::Connected;
                Some(ConnectionUpdate::StateChanged(self.state))
            }
            TransportEvent::Message(text) => {
                if self.state != ConnectionState::Connected {
                    return None;
                }
                match decode(&text) {
                    Ok(message) => Some(ConnectionUpdate::Received(message)),
                    Err(e) => {
                        log::warn!("Dropping undecodable message: {} ({})", e, crate::protocol::preview(&text));
                        Some(ConnectionUpdate::DecodeFailed(e))
                    }
                }
            }
            TransportEvent::Closed { code, reason } => {
                log::info!("Connection closed: {} {}", code, reason);
                self.force_disconnected()
            }
            TransportEvent::Failed(error) => {
                log::error!("Connection failed: {}", error);
                self.force_disconnected()
            }
        }
    }

    fn force_disconnected(&mut self) -> Option<ConnectionUpdate> {
        self.disconnect();
        Some(ConnectionUpdate::StateChanged(ConnectionState::Disconnected))
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
