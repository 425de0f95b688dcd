pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use audio::{AudioChunk, CaptureSource, FrameEncoder, MicCapture};
pub use client::{
    ClientEvent, ClientState, DictationClient, SocketConnection, SocketTransport,
    SpeechRecognizer, TranscriptionClient, TransmissionBuffer, WebSocketTransport,
};
pub use config::Config;
pub use error::{CaptureError, ClientError, EncodeError, SessionError};
pub use session::{RecognitionSession, SessionConfig, SessionStats};
