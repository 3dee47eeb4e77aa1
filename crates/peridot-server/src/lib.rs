//! Peridot WebSocket Relay Server
//!
//! Fans stroke messages out to every other participant in the same room.
//!
//! ## Protocol
//!
//! Clients connect to `/` (the `lobby` room) or `/{room}` and exchange JSON
//! text frames:
//! ```json
//! { "type": "draw", "uuid": "…", "action": 0, "width": 6.0, "color": -65536, "x": 10.0, "y": 20.0 }
//! { "type": "clear", "uuid": "…" }
//! ```
//! Frames that do not decode are dropped. When a connection closes while one
//! of its strokes is still down, the relay sends peers a `cancel` for it.

use axum::{
    Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use peridot_core::protocol::{Action, DrawMessage, WireMessage, decode, encode};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Room joined by clients connecting to `/`.
pub const DEFAULT_ROOM: &str = "lobby";
pub const DEFAULT_PORT: u16 = 3030;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Per-room broadcast buffer; slower peers beyond this lag and lose frames.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Read `PERIDOT_ADDR` and `PERIDOT_CHANNEL_CAPACITY`, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let addr = std::env::var("PERIDOT_ADDR")
            .ok()
            .and_then(|v| match v.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!("Ignoring PERIDOT_ADDR={}: {}", v, e);
                    None
                }
            })
            .unwrap_or(defaults.addr);
        let channel_capacity = std::env::var("PERIDOT_CHANNEL_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.channel_capacity);
        Self {
            addr,
            channel_capacity,
        }
    }
}

/// Broadcast payload: sender peer id and encoded frame.
type Frame = (String, String);

/// Room state
struct Room {
    tx: broadcast::Sender<Frame>,
    peers: HashSet<String>,
}

impl Room {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

/// Shared application state
pub struct AppState {
    rooms: DashMap<String, Room>,
    channel_capacity: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl AppState {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            channel_capacity,
        }
    }

    /// Add peer to room, creating it if needed.
    fn join_room(&self, room_id: &str, peer_id: &str) -> (broadcast::Receiver<Frame>, usize) {
        let mut room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(self.channel_capacity));
        room.peers.insert(peer_id.to_string());
        (room.tx.subscribe(), room.peers.len())
    }

    /// Remove peer from room, dropping the room once empty.
    fn leave_room(&self, room_id: &str, peer_id: &str) {
        self.rooms.remove_if_mut(room_id, |_, room| {
            room.peers.remove(peer_id);
            room.peers.is_empty()
        });
    }

    /// Broadcast a frame to room
    fn broadcast(&self, room_id: &str, from: &str, text: String) {
        if let Some(room) = self.rooms.get(room_id) {
            let _ = room.tx.send((from.to_string(), text));
        }
    }

    /// Peers currently in `room_id`.
    pub fn peer_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.peers.len())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Strokes a connection has started but not yet ended, with their latest sample.
#[derive(Debug, Default)]
struct OpenStrokes {
    last: HashMap<String, DrawMessage>,
}

impl OpenStrokes {
    fn observe(&mut self, message: &WireMessage) {
        let WireMessage::Draw(draw) = message else {
            return;
        };
        match draw.action {
            Action::Down => {
                self.last.insert(draw.uuid.clone(), draw.clone());
            }
            Action::Move => {
                if let Some(last) = self.last.get_mut(&draw.uuid) {
                    *last = draw.clone();
                }
            }
            Action::Up | Action::Cancel => {
                self.last.remove(&draw.uuid);
            }
        }
    }

    /// Cancel messages for every stroke still open.
    fn cancel_all(&mut self) -> Vec<WireMessage> {
        self.last
            .drain()
            .map(|(_, draw)| {
                WireMessage::Draw(DrawMessage {
                    action: Action::Cancel,
                    ..draw
                })
            })
            .collect()
    }
}

/// Build the relay router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(lobby_handler))
        .route("/health", get(health))
        .route("/{room}", get(room_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the relay on an already bound listener.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn lobby_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, DEFAULT_ROOM.to_string()))
}

async fn room_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, room))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room: String) {
    let peer_id = Uuid::new_v4().to_string();
    let (mut room_rx, peer_count) = state.join_room(&room, &peer_id);
    info!("Peer {} joined room {} ({} peers)", peer_id, room, peer_count);

    let (mut sender, mut receiver) = socket.split();
    let mut strokes = OpenStrokes::default();

    loop {
        tokio::select! {
            // Handle incoming frames from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match decode(text.as_str()) {
                        Ok(message) => {
                            strokes.observe(&message);
                            state.broadcast(&room, &peer_id, encode(&message));
                        }
                        Err(e) => warn!("Dropping invalid frame from {}: {}", peer_id, e),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore binary, ping and pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }

            // Forward frames from the rest of the room
            msg = room_rx.recv() => {
                match msg {
                    Ok((from, text)) => {
                        // Don't echo back to sender
                        if from != peer_id && sender.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Peer {} lagged, {} frames dropped", peer_id, missed);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    // Release strokes the peer left hanging
    for cancel in strokes.cancel_all() {
        debug!("Cancelling open stroke {} for {}", cancel.uuid(), peer_id);
        state.broadcast(&room, &peer_id, encode(&cancel));
    }
    state.leave_room(&room, &peer_id);
    info!("Connection closed: {}", peer_id);
}
