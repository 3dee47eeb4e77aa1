//! Message transports carrying wire frames between participants.
//!
//! A transport delivers its lifecycle and inbound frames through an
//! [`EventSink`] instead of touching engine state, so the engine decides on
//! which thread they are handled.

mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod websocket;

pub use memory::{MemoryPeer, MemoryTransport};
#[cfg(not(target_arch = "wasm32"))]
pub use websocket::WebSocketTransport;

use thiserror::Error;

/// Something a transport observed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is open and ready to send.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The peer closed the connection.
    Closed { code: u16, reason: String },
    /// The connection failed or dropped.
    Failed(String),
}

/// Receives transport events, possibly from another thread.
pub type EventSink = Box<dyn Fn(TransportEvent) + Send + 'static>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Transport is not open")]
    NotOpen,
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Transport error: {0}")]
    Other(String),
}

/// An ordered, reliable, message-oriented duplex channel.
pub trait Transport {
    /// Begin opening a connection. Completion is reported later through
    /// `sink` as [`TransportEvent::Opened`] or [`TransportEvent::Failed`].
    fn open(&mut self, url: &str, sink: EventSink) -> Result<(), TransportError>;

    /// Queue a text frame.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the connection. Closing an already closed transport does nothing.
    fn close(&mut self);
}
