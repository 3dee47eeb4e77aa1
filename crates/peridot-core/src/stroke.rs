//! A single in-progress stroke and its smoothing window.
//!
//! Raw samples are buffered three at a time. Each full triple is drawn as a
//! quadratic curve through its control points, then the window slides by two
//! so the last point of one triple starts the next. Consecutive curves
//! therefore share an endpoint and the drawn line has no seams.

use crate::geometry::{interpolate_quadratic, step_count};
use crate::pen::Pen;
use crate::surface::Surface;
use kurbo::Point;

/// Points needed before a segment can be drawn.
pub const WINDOW: usize = 3;

/// Points discarded after each drawn segment.
pub const STRIDE: usize = 2;

/// One continuous gesture from first contact to release.
#[derive(Debug, Clone)]
pub struct StrokeSession {
    buffer: Vec<Point>,
    pen: Pen,
    emitted: bool,
    segments: usize,
    dabs: usize,
}

impl StrokeSession {
    /// Start a stroke rendered with `pen`.
    pub fn new(pen: Pen) -> Self {
        Self {
            buffer: Vec::with_capacity(WINDOW),
            pen,
            emitted: false,
            segments: 0,
            dabs: 0,
        }
    }

    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    /// Raw points waiting for a full window.
    pub fn buffered(&self) -> &[Point] {
        &self.buffer
    }

    /// Whether any segment has been drawn yet.
    pub fn has_emitted(&self) -> bool {
        self.emitted
    }

    /// Number of triples drawn so far.
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Number of dabs issued so far.
    pub fn dabs(&self) -> usize {
        self.dabs
    }

    /// Add a raw sample, drawing a segment once three points are buffered.
    pub fn feed(&mut self, surface: &mut dyn Surface, point: Point) {
        self.buffer.push(point);
        if self.buffer.len() < WINDOW {
            return;
        }

        let (p0, p1, p2) = (self.buffer[0], self.buffer[1], self.buffer[2]);
        let d = step_count(p0, p1, p2);
        for i in 0..=d {
            let t = i as f64 / d as f64;
            self.pen.dab(surface, interpolate_quadratic(p0, p1, p2, t));
        }

        self.buffer.drain(..STRIDE);
        self.emitted = true;
        self.segments = self.segments.saturating_add(1);
        self.dabs = self.dabs.saturating_add(d + 1);
    }

    /// End the gesture. Leftover points that never filled a window are
    /// dropped, so a gesture of fewer than three samples draws nothing.
    pub fn finish(mut self) {
        if !self.buffer.is_empty() {
            log::trace!("Dropping {} unfinished stroke points", self.buffer.len());
        }
        self.buffer.clear();
    }
}
