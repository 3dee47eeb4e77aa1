//! Peridot Core Library
//!
//! Stroke smoothing, per-peer stroke reconstruction and connection handling
//! for a shared freehand canvas.

pub mod color;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod pen;
pub mod protocol;
pub mod session;
pub mod stroke;
pub mod surface;
pub mod sync;
pub mod transport;

pub use color::PackedColor;
pub use config::EngineConfig;
pub use engine::{Command, Engine, EngineEvent, EngineHandle, InputMode};
pub use pen::{Pen, PenMode, PenShape};
pub use protocol::{Action, DecodeError, DrawMessage, WireMessage};
pub use session::{SessionId, SessionMultiplexer};
pub use stroke::StrokeSession;
pub use surface::{RasterSurface, Surface, SurfaceError};
pub use sync::{Connection, ConnectionState, SyncError};
pub use transport::{MemoryPeer, MemoryTransport, Transport, TransportEvent};

#[cfg(not(target_arch = "wasm32"))]
pub use transport::WebSocketTransport;

/// Engine using the platform WebSocket transport.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformEngine = Engine<WebSocketTransport>;
