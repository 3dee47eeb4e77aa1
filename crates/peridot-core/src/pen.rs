//! Drawing style and the dab primitive.

use crate::color::PackedColor;
use crate::surface::Surface;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Narrowest width a pen can have.
pub const MIN_WIDTH: f64 = 1.0;

/// Dab shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenShape {
    #[default]
    Circle,
    Square,
}

/// Whether dabs paint the pen color or the surface background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenMode {
    #[default]
    Draw,
    Erase,
}

/// Drawing style applied to every dab of a stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pen {
    color: PackedColor,
    width: f64,
    shape: PenShape,
    mode: PenMode,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            color: PackedColor::GRAY,
            width: 6.0,
            shape: PenShape::Circle,
            mode: PenMode::Draw,
        }
    }
}

impl Pen {
    /// Create a circle pen in draw mode.
    pub fn new(color: PackedColor, width: f64) -> Self {
        Self::with_shape(color, width, PenShape::Circle)
    }

    pub fn with_shape(color: PackedColor, width: f64, shape: PenShape) -> Self {
        let mut pen = Self {
            color,
            shape,
            ..Self::default()
        };
        pen.set_width(width);
        pen
    }

    pub fn set_color(&mut self, color: PackedColor) {
        self.color = color;
    }

    /// Set the width, raising anything at or below [`MIN_WIDTH`] (or NaN) to it.
    pub fn set_width(&mut self, width: f64) {
        self.width = if width > MIN_WIDTH { width } else { MIN_WIDTH };
    }

    pub fn set_shape(&mut self, shape: PenShape) {
        self.shape = shape;
    }

    pub fn set_mode(&mut self, mode: PenMode) {
        self.mode = mode;
    }

    pub fn color(&self) -> PackedColor {
        self.color
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn shape(&self) -> PenShape {
        self.shape
    }

    pub fn mode(&self) -> PenMode {
        self.mode
    }

    /// The color a dab paints on `surface`.
    pub fn effective_color(&self, surface: &dyn Surface) -> PackedColor {
        match self.mode {
            PenMode::Draw => self.color,
            PenMode::Erase => surface.background(),
        }
    }

    /// Dab at full width.
    pub fn dab(&self, surface: &mut dyn Surface, point: Point) {
        self.dab_scaled(surface, point, 1.0);
    }

    /// Dab with the half-extent scaled by `size_factor`.
    pub fn dab_scaled(&self, surface: &mut dyn Surface, point: Point, size_factor: f64) {
        let half = size_factor * self.width / 2.0;
        let color = self.effective_color(surface);
        match self.shape {
            PenShape::Circle => surface.draw_disc(point, half, color),
            PenShape::Square => surface.draw_square(point, half, color),
        }
    }
}

/// Map a 0–100 slider position to a pen width on an exponential scale
/// topping out at `max_width`.
pub fn slider_width(progress: f64, max_width: f64) -> f64 {
    if max_width <= MIN_WIDTH {
        return MIN_WIDTH;
    }
    let progress = progress.clamp(0.0, 100.0);
    let width = (progress * max_width.ln() / 100.0).exp();
    width.max(MIN_WIDTH)
}
