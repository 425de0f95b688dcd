use serde::{Deserialize, Serialize};

/// Configuration for a recognition session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Whether captured chunks are retained for the offline MP3
    /// conversion path
    pub retain_audio: bool,

    /// Bitrate for the offline MP3 conversion, in kbps
    pub mp3_bitrate_kbps: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            retain_audio: true,
            mp3_bitrate_kbps: 128,
        }
    }
}
