use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a recognition session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether the session is currently recording
    pub is_recording: bool,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of capture chunks relayed to the recognizer
    pub chunks_relayed: usize,

    /// Number of finalized recognition results received
    pub final_results: usize,
}
