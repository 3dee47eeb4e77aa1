//! Per-participant stroke sessions sharing one surface.

use crate::pen::Pen;
use crate::stroke::StrokeSession;
use crate::surface::Surface;
use kurbo::Point;
use std::collections::HashMap;
use std::fmt;

/// Identifies whose gesture a point belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionId {
    /// This device's own pointer.
    Local,
    /// A peer, keyed by the uuid carried in its messages.
    Remote(String),
}

impl SessionId {
    pub fn remote(uuid: impl Into<String>) -> Self {
        Self::Remote(uuid.into())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionId::Local => f.write_str("local"),
            SessionId::Remote(uuid) => write!(f, "remote:{}", uuid),
        }
    }
}

/// Routes points to independent stroke sessions, at most one per id.
///
/// Every session dabs onto the same surface; overlapping pixels take
/// whichever dab landed last.
pub struct SessionMultiplexer<S: Surface> {
    sessions: HashMap<SessionId, StrokeSession>,
    surface: S,
}

impl<S: Surface> SessionMultiplexer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            sessions: HashMap::new(),
            surface,
        }
    }

    /// Start a stroke for `id`, discarding any unfinished one it had.
    pub fn begin(&mut self, id: SessionId, pen: Pen) {
        if let Some(stale) = self.sessions.insert(id.clone(), StrokeSession::new(pen)) {
            log::debug!("Replacing unfinished stroke for {}", id);
            stale.finish();
        }
    }

    /// Feed a point to `id`'s stroke. Ignored when `id` has no stroke.
    pub fn continue_stroke(&mut self, id: &SessionId, point: Point) {
        match self.sessions.get_mut(id) {
            Some(session) => session.feed(&mut self.surface, point),
            None => log::trace!("No active stroke for {}", id),
        }
    }

    /// Finish and remove `id`'s stroke, if any.
    pub fn end(&mut self, id: &SessionId) {
        if let Some(session) = self.sessions.remove(id) {
            session.finish();
        }
    }

    /// Reset the surface. Active strokes keep going on the blank surface.
    pub fn clear(&mut self) {
        self.surface.clear_to_background();
    }

    /// Drop every remote stroke, leaving the local one alone.
    pub fn evict_remote(&mut self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|id, _| !id.is_remote());
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            log::info!("Evicted {} stale remote strokes", evicted);
        }
        evicted
    }

    pub fn is_active(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn session(&self, id: &SessionId) -> Option<&StrokeSession> {
        self.sessions.get(id)
    }

    /// Number of strokes in progress.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
