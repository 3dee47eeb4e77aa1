//! Wire messages exchanged between participants.
//!
//! One JSON object per WebSocket text frame:
//! ```json
//! { "type": "draw", "uuid": "…", "action": 0, "width": 6.0, "color": -65536, "x": 10.0, "y": 20.0 }
//! { "type": "clear", "uuid": "…" }
//! ```

use crate::color::PackedColor;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Lifecycle stage of a sampled point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Action {
    Down = 0,
    Up = 1,
    Move = 2,
    Cancel = 3,
}

impl Action {
    /// Whether this action ends the gesture.
    pub fn is_terminal(self) -> bool {
        matches!(self, Action::Up | Action::Cancel)
    }
}

impl TryFrom<u8> for Action {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::Down),
            1 => Ok(Action::Up),
            2 => Ok(Action::Move),
            3 => Ok(Action::Cancel),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

impl From<Action> for u8 {
    fn from(action: Action) -> Self {
        action as u8
    }
}

/// One sampled point of a peer's stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawMessage {
    pub uuid: String,
    pub action: Action,
    pub width: f64,
    pub color: PackedColor,
    pub x: f64,
    pub y: f64,
}

impl DrawMessage {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A message on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// A stroke sample.
    Draw(DrawMessage),
    /// Reset the canvas.
    Clear { uuid: String },
}

impl WireMessage {
    pub fn draw(uuid: impl Into<String>, action: Action, width: f64, color: PackedColor, point: Point) -> Self {
        WireMessage::Draw(DrawMessage {
            uuid: uuid.into(),
            action,
            width,
            color,
            x: point.x,
            y: point.y,
        })
    }

    pub fn clear(uuid: impl Into<String>) -> Self {
        WireMessage::Clear { uuid: uuid.into() }
    }

    /// Identifier of the participant that sent the message.
    pub fn uuid(&self) -> &str {
        match self {
            WireMessage::Draw(draw) => &draw.uuid,
            WireMessage::Clear { uuid } => uuid,
        }
    }
}

/// Reasons an inbound frame could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("Message has no type")]
    MissingType,
    #[error("Unknown message type: {0}")]
    UnknownType(String),
    #[error("Invalid message field: {0}")]
    InvalidField(#[source] serde_json::Error),
}

const KNOWN_TYPES: [&str; 2] = ["draw", "clear"];

/// Serialize a message to its JSON text form.
pub fn encode(message: &WireMessage) -> String {
    // Serializing plain strings and numbers cannot fail.
    serde_json::to_string(message).unwrap_or_default()
}

/// Parse a JSON text frame.
pub fn decode(text: &str) -> Result<WireMessage, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?;
    if !KNOWN_TYPES.contains(&kind) {
        return Err(DecodeError::UnknownType(kind.to_string()));
    }
    serde_json::from_value(value).map_err(DecodeError::InvalidField)
}

/// At most the first 100 characters of a frame, for log lines.
pub(crate) fn preview(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
