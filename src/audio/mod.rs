pub mod capture;
pub mod encode;
pub mod resample;

pub use capture::{AudioChunk, CaptureSource, MicCapture};
pub use encode::{chunks_to_mp3, FrameEncoder};
pub use resample::{
    decimate, pcm_bytes, quantize_i16, resample_linear, transform_for_streaming,
    STREAM_SAMPLE_RATE,
};
