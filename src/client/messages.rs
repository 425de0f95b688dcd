use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::DictationConfig;

/// Audio frame status markers for the dictation protocol.
pub const STATUS_FIRST: u8 = 0;
pub const STATUS_CONTINUE: u8 = 1;
pub const STATUS_LAST: u8 = 2;

/// Outbound dictation frame
#[derive(Debug, Serialize)]
pub struct DictationFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common: Option<CommonParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business: Option<BusinessParams>,
    pub data: AudioPayload,
}

#[derive(Debug, Serialize)]
pub struct CommonParams {
    pub app_id: String,
}

#[derive(Debug, Serialize)]
pub struct BusinessParams {
    pub language: String,
    pub domain: String,
    pub accent: String,
    pub vad_eos: u32,
    pub ptt: u8,
}

#[derive(Debug, Serialize)]
pub struct AudioPayload {
    pub status: u8,
    pub format: String,
    pub encoding: String,
    /// Base64-encoded 16 kHz little-endian PCM
    pub audio: String,
}

impl AudioPayload {
    fn new(status: u8, pcm: &[u8]) -> Self {
        Self {
            status,
            format: "audio/L16;rate=16000".to_string(),
            encoding: "raw".to_string(),
            audio: BASE64.encode(pcm),
        }
    }
}

impl DictationFrame {
    /// First frame of an utterance: business envelope plus audio.
    pub fn first(app_id: &str, config: &DictationConfig, pcm: &[u8]) -> Self {
        Self {
            common: Some(CommonParams {
                app_id: app_id.to_string(),
            }),
            business: Some(BusinessParams {
                language: config.language.clone(),
                domain: config.domain.clone(),
                accent: config.accent.clone(),
                vad_eos: config.vad_eos,
                ptt: config.punctuation as u8,
            }),
            data: AudioPayload::new(STATUS_FIRST, pcm),
        }
    }

    /// Continuation frame: audio only.
    pub fn middle(pcm: &[u8]) -> Self {
        Self {
            common: None,
            business: None,
            data: AudioPayload::new(STATUS_CONTINUE, pcm),
        }
    }

    /// Terminal frame: empty payload, sent once after drain + stop.
    pub fn last() -> Self {
        Self {
            common: None,
            business: None,
            data: AudioPayload::new(STATUS_LAST, &[]),
        }
    }
}

/// Inbound dictation message
#[derive(Debug, Deserialize)]
pub struct DictationResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sid: String,
    pub data: Option<DictationData>,
}

#[derive(Debug, Deserialize)]
pub struct DictationData {
    #[serde(default)]
    pub status: i64,
    pub result: Option<DictationResult>,
}

#[derive(Debug, Deserialize)]
pub struct DictationResult {
    #[serde(default)]
    pub ws: Vec<WordSlice>,
}

#[derive(Debug, Deserialize)]
pub struct WordSlice {
    #[serde(default)]
    pub cw: Vec<CandidateWord>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateWord {
    #[serde(default)]
    pub w: String,
}

impl DictationResponse {
    /// Concatenated text of the result word list, if the message carried
    /// a result at all.
    pub fn text(&self) -> Option<String> {
        let result = self.data.as_ref()?.result.as_ref()?;
        Some(concat_words(&result.ws))
    }
}

/// Inbound transcription envelope. `data` is a JSON-encoded string for
/// result messages.
#[derive(Debug, Deserialize)]
pub struct TranscriptionEnvelope {
    pub action: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionData {
    pub cn: SentenceContainer,
    #[serde(default)]
    pub seg_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SentenceContainer {
    pub st: Sentence,
}

#[derive(Debug, Deserialize)]
pub struct Sentence {
    /// "0" = final, "1" = interim
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub rt: Vec<RecognizedText>,
}

#[derive(Debug, Deserialize)]
pub struct RecognizedText {
    #[serde(default)]
    pub ws: Vec<WordSlice>,
}

impl TranscriptionData {
    pub fn is_final(&self) -> bool {
        self.cn.st.kind == "0"
    }

    /// Concatenated recognized text, or None when the message carried no
    /// words.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .cn
            .st
            .rt
            .iter()
            .map(|rt| concat_words(&rt.ws))
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Terminal control message for the transcription stream.
pub fn end_frame() -> String {
    serde_json::json!({ "end": true }).to_string()
}

fn concat_words(slices: &[WordSlice]) -> String {
    slices
        .iter()
        .filter_map(|slice| slice.cw.first())
        .map(|cw| cw.w.as_str())
        .collect()
}
