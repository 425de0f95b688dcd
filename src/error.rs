use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("no usable capture device: {0}")]
    DeviceUnavailable(String),

    #[error("capture stream error: {0}")]
    Stream(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("protocol error (code {code}): {message}")]
    Protocol { code: i64, message: String },

    #[error("connection closed unexpectedly")]
    UnexpectedClose,

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("encoder initialization failed: {0}")]
    Init(String),

    #[error("encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("session is already running")]
    AlreadyRunning,
}
