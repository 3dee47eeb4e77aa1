//! Engine configuration.

use crate::color::PackedColor;
use crate::pen::Pen;
use serde::{Deserialize, Serialize};

/// Default relay address.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:3030/";

/// Settings for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// WebSocket URL of the relay.
    pub server_url: String,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Canvas background, also the color erasing paints.
    pub background: PackedColor,
    /// Initial style of the local pen.
    pub local_pen: Pen,
    /// Upper end of the width slider.
    pub max_brush_width: f64,
    /// Drop unfinished remote strokes when the connection goes down.
    pub evict_on_disconnect: bool,
    /// Identifier sent with local messages. A random one is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            canvas_width: 1080,
            canvas_height: 1920,
            background: PackedColor::WHITE,
            local_pen: Pen::default(),
            max_brush_width: 64.0,
            evict_on_disconnect: false,
            client_id: None,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        // Route the width back through the setter so it is clamped.
        let width = config.local_pen.width();
        config.local_pen.set_width(width);
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
