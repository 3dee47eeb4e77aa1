//! Native WebSocket transport.

use super::{EventSink, Transport, TransportError, TransportEvent};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::protocol::CloseFrame;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, connect};
use url::Url;

/// Read timeout that bounds how long outgoing frames wait behind a read.
const READ_POLL: Duration = Duration::from_millis(20);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Commands sent to the socket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket transport backed by a background thread.
#[derive(Default)]
pub struct WebSocketTransport {
    cmd_tx: Option<Sender<WsCommand>>,
    thread: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a `ws://` URL. `wss://` is refused since the socket is
    /// built without TLS support.
    pub fn parse_url(url: &str) -> Result<Url, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "ws" => Ok(parsed),
            other => Err(TransportError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, url: &str, sink: EventSink) -> Result<(), TransportError> {
        if self.cmd_tx.is_some() {
            return Err(TransportError::Other("Already open".to_string()));
        }
        let url = Self::parse_url(url)?.to_string();

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let handle = thread::Builder::new()
            .name("peridot-ws".to_string())
            .spawn(move || run_socket(url, cmd_rx, sink))
            .map_err(|e| TransportError::Other(format!("Failed to spawn socket thread: {}", e)))?;

        self.cmd_tx = Some(cmd_tx);
        self.thread = Some(handle);
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        let tx = self.cmd_tx.as_ref().ok_or(TransportError::NotOpen)?;
        tx.send(WsCommand::Send(text))
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn close(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        // The thread exits on its own once it sees the close command.
        self.thread = None;
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_socket(url: String, cmd_rx: Receiver<WsCommand>, sink: EventSink) {
    log::info!("WebSocket thread: connecting to {}", url);

    let mut socket = match connect(url.as_str()) {
        Ok((socket, response)) => {
            log::info!("WebSocket connected, status: {}", response.status());
            socket
        }
        Err(e) => {
            log::error!("WebSocket connection failed: {}", e);
            sink(TransportEvent::Failed(format!("Connection failed: {}", e)));
            return;
        }
    };

    match socket.get_mut() {
        MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(READ_POLL));
            let _ = tcp.set_write_timeout(Some(WRITE_TIMEOUT));
        }
        #[allow(unreachable_patterns)]
        _ => log::debug!("Non-plain stream, using default timeouts"),
    }
    sink(TransportEvent::Opened);

    loop {
        // Flush every queued outgoing frame before blocking on a read.
        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(text)) => {
                    log::debug!("WebSocket sending: {}", crate::protocol::preview(&text));
                    if let Err(e) = socket.send(Message::Text(text)) {
                        log::error!("WebSocket send error: {}", e);
                        sink(TransportEvent::Failed(e.to_string()));
                        return;
                    }
                }
                Ok(WsCommand::Close) | Err(TryRecvError::Disconnected) => {
                    log::info!("WebSocket close requested");
                    let _ = socket.close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "".into(),
                    }));
                    let _ = socket.flush();
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                log::debug!("WebSocket received: {}", crate::protocol::preview(&text));
                sink(TransportEvent::Message(text));
            }
            Ok(Message::Close(frame)) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.to_string()))
                    .unwrap_or((1005, String::new()));
                log::info!("WebSocket closed by peer: {} {}", code, reason);
                sink(TransportEvent::Closed { code, reason });
                return;
            }
            // tungstenite answers pings itself on the next flush.
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                let _ = socket.flush();
            }
            Err(tungstenite::Error::ConnectionClosed) => {
                sink(TransportEvent::Closed {
                    code: 1000,
                    reason: String::new(),
                });
                return;
            }
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                sink(TransportEvent::Failed(e.to_string()));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(WebSocketTransport::parse_url("ws://localhost:3030/").is_ok());
        assert!(matches!(
            WebSocketTransport::parse_url("wss://example.com/room"),
            Err(TransportError::UnsupportedScheme(s)) if s == "wss"
        ));
        assert!(matches!(
            WebSocketTransport::parse_url("http://localhost"),
            Err(TransportError::UnsupportedScheme(s)) if s == "http"
        ));
        assert!(matches!(
            WebSocketTransport::parse_url("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_send_before_open() {
        let mut transport = WebSocketTransport::new();
        assert!(matches!(transport.send("x".to_string()), Err(TransportError::NotOpen)));
        transport.close();
        transport.close();
    }
}
