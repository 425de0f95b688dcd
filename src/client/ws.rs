// TLS WebSocket transport over tungstenite
//
// The blocking socket lives on a dedicated thread: a pump loop drains
// queued outbound frames, then polls the socket with a short read
// timeout. Events are bridged into tokio through an unbounded channel.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::transport::{SocketConnection, SocketTransport, TransportEvent, WireFrame};
use crate::error::ClientError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const SETUP_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

type WsSocket = tungstenite::WebSocket<native_tls::TlsStream<TcpStream>>;

/// Production transport: wss:// via tungstenite + native-tls.
#[derive(Debug, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn SocketConnection>, ClientError> {
        let url_owned = url.to_string();
        let socket = tokio::task::spawn_blocking(move || connect_blocking(&url_owned))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))??;

        let (out_tx, out_rx) = std::sync::mpsc::channel::<Outbound>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        let open_flag = Arc::clone(&open);
        std::thread::spawn(move || pump_socket(socket, out_rx, event_tx, open_flag));

        Ok(Box::new(WsConnection {
            out_tx,
            event_rx,
            open,
        }))
    }
}

enum Outbound {
    Frame(WireFrame),
    Close,
}

struct WsConnection {
    out_tx: std::sync::mpsc::Sender<Outbound>,
    event_rx: mpsc::UnboundedReceiver<TransportEvent>,
    open: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl SocketConnection for WsConnection {
    async fn send(&mut self, frame: WireFrame) -> Result<(), ClientError> {
        self.out_tx
            .send(Outbound::Frame(frame))
            .map_err(|_| ClientError::Transport("socket thread is gone".to_string()))
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.event_rx.recv().await
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&mut self) {
        let _ = self.out_tx.send(Outbound::Close);
    }
}

/// Resolve, connect with timeouts, wrap in TLS, and complete the
/// WebSocket handshake. The read timeout is long during setup and
/// shortened afterwards so the pump loop can interleave reads and writes.
fn connect_blocking(ws_url: &str) -> Result<WsSocket, ClientError> {
    let url =
        url::Url::parse(ws_url).map_err(|e| ClientError::Handshake(format!("bad URL: {}", e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| ClientError::Handshake("no host in URL".to_string()))?
        .to_string();
    let port = url.port().unwrap_or(443);

    let addr = format!("{}:{}", host, port)
        .to_socket_addrs()
        .map_err(|e| ClientError::Handshake(e.to_string()))?
        .next()
        .ok_or_else(|| ClientError::Handshake(format!("failed to resolve hostname: {}", host)))?;

    let tcp_stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
        .map_err(|e| ClientError::Handshake(e.to_string()))?;
    tcp_stream
        .set_read_timeout(Some(SETUP_TIMEOUT))
        .map_err(|e| ClientError::Handshake(e.to_string()))?;
    tcp_stream
        .set_write_timeout(Some(SETUP_TIMEOUT))
        .map_err(|e| ClientError::Handshake(e.to_string()))?;
    tcp_stream
        .set_nodelay(true)
        .map_err(|e| ClientError::Handshake(e.to_string()))?;

    let connector =
        native_tls::TlsConnector::new().map_err(|e| ClientError::Handshake(e.to_string()))?;
    let tls_stream = connector
        .connect(&host, tcp_stream)
        .map_err(|e| ClientError::Handshake(e.to_string()))?;

    let (socket, _response) = tungstenite::client::client(ws_url, tls_stream)
        .map_err(|e| ClientError::Handshake(e.to_string()))?;

    socket
        .get_ref()
        .get_ref()
        .set_read_timeout(Some(POLL_TIMEOUT))
        .map_err(|e| ClientError::Handshake(e.to_string()))?;

    debug!("websocket connected to {}", host);

    Ok(socket)
}

fn pump_socket(
    mut socket: WsSocket,
    out_rx: std::sync::mpsc::Receiver<Outbound>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    open: Arc<AtomicBool>,
) {
    loop {
        // Drain everything queued for sending before polling the socket
        loop {
            match out_rx.try_recv() {
                Ok(Outbound::Frame(frame)) => {
                    let message = match frame {
                        WireFrame::Text(text) => tungstenite::Message::Text(text.into()),
                        WireFrame::Binary(bytes) => tungstenite::Message::Binary(bytes.into()),
                    };
                    if socket.write(message).and_then(|_| socket.flush()).is_err() {
                        open.store(false, Ordering::SeqCst);
                        let _ = event_tx.send(TransportEvent::Closed);
                        return;
                    }
                }
                Ok(Outbound::Close) => {
                    let _ = socket.close(None);
                    let _ = socket.flush();
                }
                Err(std::sync::mpsc::TryRecvError::Empty) => break,
                Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    // Connection handle dropped; shut the socket down
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    open.store(false, Ordering::SeqCst);
                    return;
                }
            }
        }

        match socket.read() {
            Ok(tungstenite::Message::Text(text)) => {
                let _ = event_tx.send(TransportEvent::Message(WireFrame::Text(text.to_string())));
            }
            Ok(tungstenite::Message::Binary(bytes)) => {
                let _ =
                    event_tx.send(TransportEvent::Message(WireFrame::Binary(bytes.to_vec())));
            }
            Ok(tungstenite::Message::Close(_)) => {
                open.store(false, Ordering::SeqCst);
                let _ = event_tx.send(TransportEvent::Closed);
                return;
            }
            Ok(_) => {} // ping/pong handled by tungstenite
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // Idle poll; loop back to check outbound queue
            }
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                open.store(false, Ordering::SeqCst);
                let _ = event_tx.send(TransportEvent::Closed);
                return;
            }
            Err(e) => {
                warn!("websocket read error: {}", e);
                open.store(false, Ordering::SeqCst);
                let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                let _ = event_tx.send(TransportEvent::Closed);
                return;
            }
        }
    }
}
