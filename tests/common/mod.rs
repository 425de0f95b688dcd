// Fake socket transport for driving the protocol clients in tests
// without a network.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use speechwire::client::{SocketConnection, SocketTransport, TransportEvent, WireFrame};
use speechwire::config::Credentials;
use speechwire::error::ClientError;
use tokio::sync::mpsc;

/// Test-side handle for one accepted connection.
#[derive(Clone)]
pub struct FakeConnHandle {
    pub url: String,
    sent: Arc<Mutex<Vec<WireFrame>>>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    open: Arc<AtomicBool>,
}

impl FakeConnHandle {
    pub fn sent_frames(&self) -> Vec<WireFrame> {
        self.sent.lock().unwrap().clone()
    }

    /// Deliver a text message from the fake server.
    pub fn push_text(&self, text: &str) {
        let _ = self
            .event_tx
            .send(TransportEvent::Message(WireFrame::Text(text.to_string())));
    }

    /// Close the connection from the server side.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.event_tx.send(TransportEvent::Closed);
    }
}

/// SocketTransport that records every connection attempt and hands the
/// test a handle to drive each one.
pub struct FakeTransport {
    connections: Arc<Mutex<Vec<FakeConnHandle>>>,
}

impl FakeTransport {
    pub fn new() -> (Self, Arc<Mutex<Vec<FakeConnHandle>>>) {
        let connections = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                connections: Arc::clone(&connections),
            },
            connections,
        )
    }
}

#[async_trait::async_trait]
impl SocketTransport for FakeTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn SocketConnection>, ClientError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let open = Arc::new(AtomicBool::new(true));

        let handle = FakeConnHandle {
            url: url.to_string(),
            sent: Arc::clone(&sent),
            event_tx,
            open: Arc::clone(&open),
        };
        self.connections.lock().unwrap().push(handle);

        Ok(Box::new(FakeConnection {
            sent,
            event_rx,
            open,
        }))
    }
}

struct FakeConnection {
    sent: Arc<Mutex<Vec<WireFrame>>>,
    event_rx: mpsc::UnboundedReceiver<TransportEvent>,
    open: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl SocketConnection for FakeConnection {
    async fn send(&mut self, frame: WireFrame) -> Result<(), ClientError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection closed".to_string()));
        }
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.event_rx.recv().await
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Transport whose connection attempts always fail, counting them.
pub struct FailingTransport {
    attempts: Arc<Mutex<usize>>,
}

impl FailingTransport {
    pub fn new() -> (Self, Arc<Mutex<usize>>) {
        let attempts = Arc::new(Mutex::new(0));
        (
            Self {
                attempts: Arc::clone(&attempts),
            },
            attempts,
        )
    }
}

#[async_trait::async_trait]
impl SocketTransport for FailingTransport {
    async fn connect(&self, _url: &str) -> Result<Box<dyn SocketConnection>, ClientError> {
        *self.attempts.lock().unwrap() += 1;
        Err(ClientError::Handshake("connection refused".to_string()))
    }
}

pub fn test_credentials() -> Credentials {
    Credentials {
        app_id: "test-app".to_string(),
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
    }
}
