use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::error::CaptureError;

/// A chunk of captured audio: mono float samples at the device rate.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Audio capture capability
///
/// Implementations push fixed-size mono float chunks through the returned
/// channel. The session layer treats this as a pull-free event source.
#[async_trait::async_trait]
pub trait CaptureSource: Send + Sync {
    /// Start capturing audio
    ///
    /// Acquisition failures surface here, before any chunk is delivered.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if the source is currently capturing
    fn is_capturing(&self) -> bool;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Default microphone capture via cpal.
///
/// The cpal stream is not `Send`, so it lives on a dedicated thread that
/// forwards chunks into a tokio channel and exits when the stop flag is
/// set.
pub struct MicCapture {
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
    capturing: bool,
}

impl MicCapture {
    pub fn new() -> Self {
        Self {
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread: None,
            capturing: false,
        }
    }
}

impl Default for MicCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureSource for MicCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.capturing {
            return Err(CaptureError::Stream("already capturing".to_string()));
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();

        self.stop_flag.store(false, Ordering::SeqCst);
        let stop_flag = Arc::clone(&self.stop_flag);

        let thread = std::thread::spawn(move || {
            run_capture_thread(chunk_tx, ready_tx, stop_flag);
        });

        match ready_rx.await {
            Ok(Ok(sample_rate)) => {
                info!("microphone capture started ({} Hz)", sample_rate);
                self.thread = Some(thread);
                self.capturing = true;
                Ok(chunk_rx)
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CaptureError::Stream(
                    "capture thread exited before reporting readiness".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.capturing {
            return Ok(());
        }

        info!("stopping microphone capture");
        self.stop_flag.store(true, Ordering::SeqCst);

        if let Some(handle) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }

        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

fn run_capture_thread(
    chunk_tx: mpsc::Sender<AudioChunk>,
    ready_tx: oneshot::Sender<Result<u32, CaptureError>>,
    stop_flag: Arc<AtomicBool>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(
                "no input device available".to_string(),
            )));
            return;
        }
    };

    let config = match device.default_input_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(classify_acquisition_error(e.to_string())));
            return;
        }
    };

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    let err_fn = |err: cpal::StreamError| error!("capture stream error: {}", err);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let tx = chunk_tx.clone();
            device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples = downmix_f32(data, channels);
                    // Overflow is silently dropped; the callback must not block
                    let _ = tx.try_send(AudioChunk {
                        samples,
                        sample_rate,
                    });
                },
                err_fn,
                None,
            )
        }
        cpal::SampleFormat::I16 => {
            let tx = chunk_tx.clone();
            device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let floats: Vec<f32> =
                        data.iter().map(|&s| s as f32 / 32768.0).collect();
                    let samples = downmix_f32(&floats, channels);
                    let _ = tx.try_send(AudioChunk {
                        samples,
                        sample_rate,
                    });
                },
                err_fn,
                None,
            )
        }
        other => {
            let _ = ready_tx.send(Err(CaptureError::Stream(format!(
                "unsupported sample format: {:?}",
                other
            ))));
            return;
        }
    };

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(classify_acquisition_error(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::Stream(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(sample_rate));

    // Keep the stream alive until asked to stop
    while !stop_flag.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    drop(stream);
}

/// Collapse interleaved frames to mono by averaging channels.
fn downmix_f32(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// cpal has no typed permission error, so the message text decides which
/// acquisition failure this is.
fn classify_acquisition_error(message: String) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("access") {
        CaptureError::PermissionDenied(message)
    } else {
        warn!("treating capture acquisition failure as unavailable device: {}", message);
        CaptureError::DeviceUnavailable(message)
    }
}
