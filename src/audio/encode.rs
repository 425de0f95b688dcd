// Streaming MP3 encoding for the offline conversion path

use mp3lame_encoder::{max_required_buffer_size, Birtate, Builder, FlushNoGap, MonoPcm};
use tracing::debug;

use super::resample::quantize_i16;
use crate::error::EncodeError;

/// Samples consumed per MP3 frame.
pub const SAMPLES_PER_FRAME: usize = 1152;

/// Default encoding bitrate in kbps.
pub const DEFAULT_BITRATE_KBPS: u32 = 128;

/// Streaming mono MP3 encoder.
///
/// PCM fed through [`encode`](Self::encode) is consumed in 1152-sample
/// frames; samples short of a full frame are carried over to the next
/// call. [`finish`](Self::finish) drops any sub-frame remainder and
/// appends the encoder's trailing bytes.
pub struct FrameEncoder {
    encoder: mp3lame_encoder::Encoder,
    pending: Vec<i16>,
}

impl FrameEncoder {
    pub fn new(sample_rate: u32, bitrate_kbps: u32) -> Result<Self, EncodeError> {
        let mut builder = Builder::new()
            .ok_or_else(|| EncodeError::Init("failed to allocate LAME encoder".to_string()))?;

        builder
            .set_num_channels(1)
            .map_err(|e| EncodeError::Init(format!("channels: {}", e)))?;
        builder
            .set_sample_rate(sample_rate)
            .map_err(|e| EncodeError::Init(format!("sample rate: {}", e)))?;
        builder
            .set_brate(bitrate(bitrate_kbps)?)
            .map_err(|e| EncodeError::Init(format!("bitrate: {}", e)))?;

        let encoder = builder
            .build()
            .map_err(|e| EncodeError::Init(e.to_string()))?;

        Ok(Self {
            encoder,
            pending: Vec::new(),
        })
    }

    /// Encode as many complete frames as are available, returning the
    /// compressed bytes produced so far (possibly empty while the encoder
    /// buffers internally).
    pub fn encode(&mut self, pcm: &[i16]) -> Result<Vec<u8>, EncodeError> {
        self.pending.extend_from_slice(pcm);

        let mut out = Vec::new();
        let full_frames = self.pending.len() / SAMPLES_PER_FRAME;
        for i in 0..full_frames {
            let frame = &self.pending[i * SAMPLES_PER_FRAME..(i + 1) * SAMPLES_PER_FRAME];
            out.reserve(max_required_buffer_size(frame.len()));
            self.encoder
                .encode_to_vec(MonoPcm(frame), &mut out)
                .map_err(|e| EncodeError::Encode(e.to_string()))?;
        }
        self.pending.drain(..full_frames * SAMPLES_PER_FRAME);

        Ok(out)
    }

    /// Flush the encoder, returning its trailing bytes. Any pending
    /// samples short of a full frame are discarded.
    pub fn finish(mut self) -> Result<Vec<u8>, EncodeError> {
        if !self.pending.is_empty() {
            debug!(
                "dropping {} samples short of a full MP3 frame",
                self.pending.len()
            );
        }

        let mut out = Vec::new();
        out.reserve(max_required_buffer_size(0));
        self.encoder
            .flush_to_vec::<FlushNoGap>(&mut out)
            .map_err(|e| EncodeError::Encode(e.to_string()))?;

        Ok(out)
    }
}

/// Convert accumulated capture chunks into a complete MP3 byte blob
/// (mono, encoded at the capture rate).
pub fn chunks_to_mp3(
    chunks: &[Vec<f32>],
    sample_rate: u32,
    bitrate_kbps: u32,
) -> Result<Vec<u8>, EncodeError> {
    let total: usize = chunks.iter().map(|c| c.len()).sum();
    let mut merged = Vec::with_capacity(total);
    for chunk in chunks {
        merged.extend_from_slice(chunk);
    }

    let pcm = quantize_i16(&merged);

    let mut encoder = FrameEncoder::new(sample_rate, bitrate_kbps)?;
    let mut blob = encoder.encode(&pcm)?;
    blob.extend(encoder.finish()?);

    debug!("encoded {} samples into {} MP3 bytes", pcm.len(), blob.len());

    Ok(blob)
}

fn bitrate(kbps: u32) -> Result<Birtate, EncodeError> {
    let brate = match kbps {
        8 => Birtate::Kbps8,
        16 => Birtate::Kbps16,
        24 => Birtate::Kbps24,
        32 => Birtate::Kbps32,
        48 => Birtate::Kbps48,
        64 => Birtate::Kbps64,
        96 => Birtate::Kbps96,
        128 => Birtate::Kbps128,
        160 => Birtate::Kbps160,
        192 => Birtate::Kbps192,
        256 => Birtate::Kbps256,
        320 => Birtate::Kbps320,
        other => {
            return Err(EncodeError::Init(format!(
                "unsupported MP3 bitrate: {} kbps",
                other
            )))
        }
    };
    Ok(brate)
}
