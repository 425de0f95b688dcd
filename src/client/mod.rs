pub mod buffer;
pub mod dictation;
pub mod messages;
pub mod pacing;
pub mod signing;
pub mod transcription;
pub mod transport;
pub mod ws;

use tokio::sync::mpsc;

use crate::error::ClientError;

pub use buffer::TransmissionBuffer;
pub use dictation::DictationClient;
pub use pacing::{Pacer, PaceStep, CHUNK_SIZE, PACE_INTERVAL};
pub use signing::SigningContext;
pub use transcription::TranscriptionClient;
pub use transport::{SocketConnection, SocketTransport, TransportEvent, WireFrame};
pub use ws::WebSocketTransport;

/// Protocol client connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Connecting,
    Streaming,
    Draining,
    Closed,
}

/// Events a protocol client emits toward the session.
#[derive(Debug)]
pub enum ClientEvent {
    /// Handshake completed; audio is flowing.
    Started,
    /// A recognition message arrived. `text` is None when the message
    /// carried no new finalized text; callers filter those out before
    /// display.
    Recognition { text: Option<String> },
    Error(ClientError),
    /// The connection is finished for good. `requested` reflects whether
    /// the application asked for the closure.
    Closed { requested: bool },
}

/// Commands flowing from the session into a client task.
#[derive(Debug)]
pub(crate) enum Command {
    Audio(Vec<u8>),
    Stop,
}

/// The capability shared by both protocol variants: start the handshake,
/// feed captured samples, request a graceful stop.
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Begin the connection handshake. Recognition and lifecycle events
    /// arrive on the returned receiver.
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<ClientEvent>, ClientError>;

    /// Queue captured samples (device-rate mono floats) for transmission.
    /// A no-op after `stop`.
    fn send(&self, samples: &[f32], sample_rate: u32);

    /// Request end-of-stream: the buffer drains, the terminal marker goes
    /// out once, and the connection winds down. Idempotent.
    fn stop(&self);
}
