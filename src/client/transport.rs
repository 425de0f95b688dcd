use crate::error::ClientError;

/// A single outbound or inbound socket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Events observed on an established connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(WireFrame),
    /// The connection is gone, whether by close frame or transport
    /// failure. Always the last event delivered.
    Closed,
    Error(String),
}

/// One established socket connection.
///
/// `recv` returning `None` means the connection (or its driving task) is
/// gone; callers treat it like `Closed`.
#[async_trait::async_trait]
pub trait SocketConnection: Send {
    async fn send(&mut self, frame: WireFrame) -> Result<(), ClientError>;

    async fn recv(&mut self) -> Option<TransportEvent>;

    /// Whether the socket is currently open. Pacing stops the moment this
    /// reports false.
    fn is_open(&self) -> bool;

    async fn close(&mut self);
}

/// Socket connection capability injected into protocol clients, so the
/// protocol logic carries no platform dependency and tests can drive it
/// with fake transports.
#[async_trait::async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn SocketConnection>, ClientError>;
}
