//! The drawing executor.
//!
//! [`Engine`] owns the surface, the stroke sessions, the local pen and the
//! connection. Everything that mutates them arrives as a [`Command`] on one
//! channel and is applied on whichever thread drives the engine, so the
//! surface only ever has a single writer. [`EngineHandle`] posts commands
//! from any thread; transport threads post through the same channel.

use crate::color::PackedColor;
use crate::config::EngineConfig;
use crate::pen::{Pen, PenMode, PenShape, slider_width};
use crate::protocol::{Action, WireMessage};
use crate::session::{SessionId, SessionMultiplexer};
use crate::surface::{RasterSurface, Surface};
use crate::sync::{
    Connection, ConnectionEvent, ConnectionSink, ConnectionState, ConnectionUpdate, SyncError,
};
use crate::transport::Transport;
use kurbo::Point;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use uuid::Uuid;

/// What local pointer input does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Draw,
    Erase,
    /// Pick the pen color from the canvas instead of drawing.
    ColorSample,
}

/// Work for the engine.
#[derive(Debug, Clone)]
pub enum Command {
    LocalPoint { action: Action, point: Point },
    PenWidth(f64),
    PenColor(PackedColor),
    PenShape(PenShape),
    SetMode(InputMode),
    Clear,
    Connect,
    Disconnect,
    RemoteMessage(WireMessage),
    Connection(ConnectionEvent),
    Shutdown,
}

/// Notifications for observers such as a UI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ConnectionChanged(ConnectionState),
    ColorSampled(PackedColor),
    DecodeFailed(String),
}

/// Cloneable, thread-safe front door to an [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: Sender<Command>,
}

impl EngineHandle {
    /// Queue a command. Returns `false` once the engine is gone.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn on_local_point(&self, action: Action, point: Point) -> bool {
        self.send(Command::LocalPoint { action, point })
    }

    pub fn on_pen_width_changed(&self, width: f64) -> bool {
        self.send(Command::PenWidth(width))
    }

    pub fn set_pen_color(&self, color: PackedColor) -> bool {
        self.send(Command::PenColor(color))
    }

    pub fn set_mode(&self, mode: InputMode) -> bool {
        self.send(Command::SetMode(mode))
    }

    pub fn on_remote_message_decoded(&self, message: WireMessage) -> bool {
        self.send(Command::RemoteMessage(message))
    }

    pub fn clear(&self) -> bool {
        self.send(Command::Clear)
    }

    pub fn connect(&self) -> bool {
        self.send(Command::Connect)
    }

    pub fn disconnect(&self) -> bool {
        self.send(Command::Disconnect)
    }

    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }
}

/// Shared-canvas stroke engine.
pub struct Engine<T: Transport, S: Surface = RasterSurface> {
    board: SessionMultiplexer<S>,
    local_pen: Pen,
    mode: InputMode,
    max_brush_width: f64,
    evict_on_disconnect: bool,
    client_id: String,
    connection: Connection<T>,
    tx: Sender<Command>,
    rx: Receiver<Command>,
    observers: Vec<Sender<EngineEvent>>,
    dirty: bool,
}

impl<T: Transport> Engine<T, RasterSurface> {
    /// Create an engine drawing onto a blank raster canvas.
    pub fn new(config: &EngineConfig, transport: T) -> Self {
        let surface = RasterSurface::new(config.canvas_width, config.canvas_height, config.background);
        Self::with_surface(config, transport, surface)
    }
}

impl<T: Transport, S: Surface> Engine<T, S> {
    pub fn with_surface(config: &EngineConfig, transport: T, surface: S) -> Self {
        let (tx, rx) = channel();
        let sink_tx = tx.clone();
        let sink: ConnectionSink = Arc::new(move |event| {
            let _ = sink_tx.send(Command::Connection(event));
        });
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        log::info!("Engine started as {}", client_id);

        Self {
            board: SessionMultiplexer::new(surface),
            local_pen: config.local_pen.clone(),
            mode: InputMode::Draw,
            max_brush_width: config.max_brush_width,
            evict_on_disconnect: config.evict_on_disconnect,
            client_id,
            connection: Connection::new(transport, config.server_url.clone(), sink),
            tx,
            rx,
            observers: Vec::new(),
            dirty: false,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle { tx: self.tx.clone() }
    }

    /// Receive [`EngineEvent`]s from now on.
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = channel();
        self.observers.push(tx);
        rx
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    pub fn local_pen(&self) -> &Pen {
        &self.local_pen
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn sessions(&self) -> &SessionMultiplexer<S> {
        &self.board
    }

    pub fn surface(&self) -> &S {
        self.board.surface()
    }

    pub fn surface_mut(&mut self) -> &mut S {
        self.board.surface_mut()
    }

    /// Whether the surface changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // --- Executor ---

    /// Apply every queued command without blocking. Returns how many ran.
    /// Stops early at [`Command::Shutdown`].
    pub fn process_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(command) = self.rx.try_recv() {
            count += 1;
            if !self.apply(command) {
                break;
            }
        }
        count
    }

    /// Apply commands as they arrive until [`Command::Shutdown`].
    pub fn run(&mut self) {
        while let Ok(command) = self.rx.recv() {
            if !self.apply(command) {
                break;
            }
        }
        log::info!("Engine stopped");
    }

    /// Apply one command. Returns `false` for [`Command::Shutdown`].
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::LocalPoint { action, point } => self.on_local_point(action, point),
            Command::PenWidth(width) => self.on_pen_width_changed(width),
            Command::PenColor(color) => self.set_pen_color(color),
            Command::PenShape(shape) => self.local_pen.set_shape(shape),
            Command::SetMode(mode) => self.set_mode(mode),
            Command::Clear => self.clear(),
            Command::Connect => {
                // Already logged by the connection.
                let _ = self.connect();
            }
            Command::Disconnect => self.disconnect(),
            Command::RemoteMessage(message) => self.on_remote_message_decoded(message),
            Command::Connection(event) => self.on_connection_event(event),
            Command::Shutdown => {
                self.disconnect();
                return false;
            }
        }
        true
    }

    // --- Local input ---

    /// Handle one raw pointer sample from this device.
    pub fn on_local_point(&mut self, action: Action, point: Point) {
        if self.mode == InputMode::ColorSample {
            self.sample_color(point);
            return;
        }

        let pen = self.local_pen.clone();
        self.apply_point(SessionId::Local, action, point, pen);

        let color = self.local_pen.effective_color(self.board.surface());
        self.connection.send(&WireMessage::draw(
            self.client_id.as_str(),
            action,
            self.local_pen.width(),
            color,
            point,
        ));
    }

    fn sample_color(&mut self, point: Point) {
        let Some(color) = self.board.surface().pixel_color(point) else {
            return;
        };
        self.local_pen.set_color(color);
        self.notify(EngineEvent::ColorSampled(color));
    }

    pub fn on_pen_width_changed(&mut self, width: f64) {
        self.local_pen.set_width(width);
    }

    /// Set the pen width from a 0–100 slider position.
    pub fn on_width_slider_changed(&mut self, progress: f64) {
        self.local_pen.set_width(slider_width(progress, self.max_brush_width));
    }

    pub fn set_pen_color(&mut self, color: PackedColor) {
        self.local_pen.set_color(color);
    }

    pub fn set_pen_shape(&mut self, shape: PenShape) {
        self.local_pen.set_shape(shape);
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.mode = mode;
        self.local_pen.set_mode(match mode {
            InputMode::Erase => PenMode::Erase,
            InputMode::Draw | InputMode::ColorSample => PenMode::Draw,
        });
    }

    /// Clear the canvas here and for every peer.
    pub fn clear(&mut self) {
        self.board.clear();
        self.dirty = true;
        self.connection.send(&WireMessage::clear(self.client_id.as_str()));
    }

    // --- Remote input ---

    /// Apply a message received from a peer.
    pub fn on_remote_message_decoded(&mut self, message: WireMessage) {
        if message.uuid() == self.client_id {
            log::debug!("Ignoring echo of own message");
            return;
        }
        match message {
            WireMessage::Clear { uuid } => {
                log::debug!("Canvas cleared by {}", uuid);
                self.board.clear();
                self.dirty = true;
            }
            WireMessage::Draw(draw) => {
                let pen = Pen::new(draw.color, draw.width);
                let point = draw.point();
                self.apply_point(SessionId::Remote(draw.uuid), draw.action, point, pen);
            }
        }
    }

    /// Drive one session through a sample's lifecycle stage.
    fn apply_point(&mut self, id: SessionId, action: Action, point: Point, pen: Pen) {
        if action == Action::Down {
            self.board.begin(id.clone(), pen);
        }
        self.board.continue_stroke(&id, point);
        if action.is_terminal() {
            self.board.end(&id);
        }
        self.dirty = true;
    }

    // --- Connection ---

    pub fn connect(&mut self) -> Result<(), SyncError> {
        self.connection.connect()?;
        self.notify(EngineEvent::ConnectionChanged(self.connection.state()));
        Ok(())
    }

    pub fn disconnect(&mut self) {
        let was = self.connection.state();
        self.connection.disconnect();
        if was != ConnectionState::Disconnected {
            self.on_disconnected();
        }
    }

    fn on_connection_event(&mut self, event: ConnectionEvent) {
        match self.connection.handle(event) {
            Some(ConnectionUpdate::StateChanged(ConnectionState::Disconnected)) => self.on_disconnected(),
            Some(ConnectionUpdate::StateChanged(state)) => {
                self.notify(EngineEvent::ConnectionChanged(state))
            }
            Some(ConnectionUpdate::Received(message)) => self.on_remote_message_decoded(message),
            Some(ConnectionUpdate::DecodeFailed(e)) => self.notify(EngineEvent::DecodeFailed(e.to_string())),
            None => {}
        }
    }

    fn on_disconnected(&mut self) {
        if self.evict_on_disconnect {
            self.board.evict_remote();
        }
        self.notify(EngineEvent::ConnectionChanged(ConnectionState::Disconnected));
    }

    fn notify(&mut self, event: EngineEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
