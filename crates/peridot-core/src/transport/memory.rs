//! In-memory transport for tests and offline use.

use super::{EventSink, Transport, TransportError, TransportEvent};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    sink: Option<EventSink>,
    open: bool,
    fail_open: bool,
    opened_urls: Vec<String>,
    sent: Vec<String>,
    close_calls: usize,
}

/// A transport whose far end is driven by a [`MemoryPeer`].
///
/// `open` only records the request; the peer decides when (and whether) the
/// connection opens, what arrives, and when it drops.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

/// The remote side of a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryPeer {
    state: Arc<Mutex<MemoryState>>,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for driving the far end.
    pub fn peer(&self) -> MemoryPeer {
        MemoryPeer {
            state: Arc::clone(&self.state),
        }
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, url: &str, sink: EventSink) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.opened_urls.push(url.to_string());
        if state.fail_open {
            return Err(TransportError::Other(format!("Refused: {}", url)));
        }
        state.sink = Some(sink);
        state.open = false;
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        state.sent.push(text);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = lock(&self.state);
        state.close_calls += 1;
        state.open = false;
        state.sink = None;
    }
}

impl MemoryPeer {
    fn emit(&self, event: TransportEvent) -> bool {
        let state = lock(&self.state);
        match state.sink.as_ref() {
            Some(sink) => {
                sink(event);
                true
            }
            None => false,
        }
    }

    /// Make the next `open` fail synchronously.
    pub fn refuse_connections(&self, refuse: bool) {
        lock(&self.state).fail_open = refuse;
    }

    /// Acknowledge the pending open. Returns `false` if nothing is pending.
    pub fn accept(&self) -> bool {
        lock(&self.state).open = true;
        self.emit(TransportEvent::Opened)
    }

    /// Deliver an inbound text frame.
    pub fn deliver(&self, text: impl Into<String>) -> bool {
        self.emit(TransportEvent::Message(text.into()))
    }

    /// Close from the far end.
    pub fn hang_up(&self, code: u16, reason: &str) -> bool {
        let delivered = self.emit(TransportEvent::Closed {
            code,
            reason: reason.to_string(),
        });
        lock(&self.state).open = false;
        delivered
    }

    /// Fail the connection.
    pub fn fail(&self, error: &str) -> bool {
        let delivered = self.emit(TransportEvent::Failed(error.to_string()));
        lock(&self.state).open = false;
        delivered
    }

    /// Frames sent so far.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.state).sent.clone()
    }

    /// Remove and return the frames sent so far.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut lock(&self.state).sent)
    }

    pub fn opened_urls(&self) -> Vec<String> {
        lock(&self.state).opened_urls.clone()
    }

    pub fn close_calls(&self) -> usize {
        lock(&self.state).close_calls
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_open_accept_deliver() {
        let mut transport = MemoryTransport::new();
        let peer = transport.peer();
        let (tx, rx) = channel();

        transport
            .open("ws://test", Box::new(move |event| {
                let _ = tx.send(event);
            }))
            .unwrap();
        assert!(transport.send("early".to_string()).is_err());

        assert!(peer.accept());
        assert!(peer.deliver("hello"));
        transport.send("hi".to_string()).unwrap();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events, vec![
            TransportEvent::Opened,
            TransportEvent::Message("hello".to_string()),
        ]);
        assert_eq!(peer.sent(), vec!["hi".to_string()]);
        assert_eq!(peer.opened_urls(), vec!["ws://test".to_string()]);
    }

    #[test]
    fn test_close_detaches_sink() {
        let mut transport = MemoryTransport::new();
        let peer = transport.peer();
        transport.open("ws://test", Box::new(|_| {})).unwrap();
        transport.close();
        transport.close();

        assert!(!peer.deliver("late"));
        assert_eq!(peer.close_calls(), 2);
    }

    #[test]
    fn test_refused() {
        let mut transport = MemoryTransport::new();
        transport.peer().refuse_connections(true);
        assert!(transport.open("ws://test", Box::new(|_| {})).is_err());
    }
}
