//! Point math used by the stroke smoother.

use kurbo::{ParamCurve, Point, QuadBez};

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Evaluate the quadratic blend `(1-t)²·p0 + 2t(1-t)·p1 + t²·p2`.
///
/// The result is exactly `p0` at `t = 0` and exactly `p2` at `t = 1`.
pub fn interpolate_quadratic(p0: Point, p1: Point, p2: Point, t: f64) -> Point {
    QuadBez::new(p0, p1, p2).eval(t)
}

/// Upper bound on interpolation steps for one triple. Well past any segment
/// that fits on a real canvas.
pub const MAX_STEPS: usize = 1 << 14;

/// Number of interpolation steps for a triple: one per pixel of the
/// control polygon length, plus one so a degenerate triple still dabs.
///
/// Capped at [`MAX_STEPS`]; a non-finite length counts as a single step.
pub fn step_count(p0: Point, p1: Point, p2: Point) -> usize {
    let seg_len = distance(p0, p1) + distance(p1, p2);
    if !seg_len.is_finite() {
        return 1;
    }
    1 + (seg_len.floor() as usize).min(MAX_STEPS - 1)
}
