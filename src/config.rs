use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub credentials: Credentials,
    pub dictation: DictationConfig,
    pub transcription: TranscriptionConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

/// Recognition service credentials. A fresh signing context derives from
/// these on every connection attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DictationConfig {
    pub endpoint: String,
    pub language: String,
    pub domain: String,
    pub accent: String,
    /// Trailing-silence timeout in milliseconds (vad_eos)
    pub vad_eos: u32,
    /// Whether the service should add punctuation (ptt)
    pub punctuation: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub mp3_bitrate_kbps: u32,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
