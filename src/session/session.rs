use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::{encode, CaptureSource};
use crate::client::{ClientEvent, SpeechRecognizer};
use crate::error::{EncodeError, SessionError};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A recognition session that wires one capture source into one protocol
/// client, relays captured audio through it, and collects recognition
/// results.
pub struct RecognitionSession {
    /// Session configuration
    config: SessionConfig,

    /// Protocol client performing the recognition
    recognizer: Arc<Mutex<Box<dyn SpeechRecognizer>>>,

    /// Audio capture source
    capture: Arc<Mutex<Box<dyn CaptureSource>>>,

    /// When the session was created
    started_at: chrono::DateTime<chrono::Utc>,

    /// Whether recording is currently active
    is_recording: Arc<AtomicBool>,

    /// Number of capture chunks relayed to the recognizer
    chunks_relayed: Arc<AtomicUsize>,

    /// Number of finalized recognition results received
    final_results: Arc<AtomicUsize>,

    /// Device sample rate observed from the first captured chunk
    capture_rate: Arc<AtomicU32>,

    /// Accumulated finalized text
    transcript: Arc<Mutex<String>>,

    /// Captured chunks retained for the offline MP3 path
    captured: Arc<Mutex<Vec<Vec<f32>>>>,

    /// Handle for the audio relay task
    relay_task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// Handle for the recognition event task
    event_task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RecognitionSession {
    pub fn new(
        config: SessionConfig,
        capture: Box<dyn CaptureSource>,
        recognizer: Box<dyn SpeechRecognizer>,
    ) -> Self {
        info!("Creating recognition session: {}", config.session_id);

        Self {
            config,
            recognizer: Arc::new(Mutex::new(recognizer)),
            capture: Arc::new(Mutex::new(capture)),
            started_at: Utc::now(),
            is_recording: Arc::new(AtomicBool::new(false)),
            chunks_relayed: Arc::new(AtomicUsize::new(0)),
            final_results: Arc::new(AtomicUsize::new(0)),
            capture_rate: Arc::new(AtomicU32::new(0)),
            transcript: Arc::new(Mutex::new(String::new())),
            captured: Arc::new(Mutex::new(Vec::new())),
            relay_task_handle: Arc::new(Mutex::new(None)),
            event_task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start recognizing: acquire the capture device, then open the
    /// protocol stream. Returns the outward event stream.
    ///
    /// Capture acquisition failures surface here before any connection is
    /// attempted, so a denied microphone never leaves a dangling socket.
    pub async fn start(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<ClientEvent>, SessionError> {
        if self.is_recording.load(Ordering::SeqCst) {
            warn!("recognition already started");
            return Err(SessionError::AlreadyRunning);
        }

        info!("Starting recognition session: {}", self.config.session_id);

        // Reset accumulated state from any previous run
        self.transcript.lock().await.clear();
        self.captured.lock().await.clear();
        self.chunks_relayed.store(0, Ordering::SeqCst);
        self.final_results.store(0, Ordering::SeqCst);

        // Capture first; a failure here must not open a socket
        let mut chunk_rx = {
            let mut capture = self.capture.lock().await;
            capture.start().await?
        };

        self.is_recording.store(true, Ordering::SeqCst);

        let client_rx = {
            let mut recognizer = self.recognizer.lock().await;
            match recognizer.start().await {
                Ok(rx) => rx,
                Err(e) => {
                    self.is_recording.store(false, Ordering::SeqCst);
                    let mut capture = self.capture.lock().await;
                    if let Err(stop_err) = capture.stop().await {
                        error!("failed to stop capture after client error: {}", stop_err);
                    }
                    return Err(e.into());
                }
            }
        };

        // Relay captured chunks into the recognizer
        let recognizer = Arc::clone(&self.recognizer);
        let is_recording = Arc::clone(&self.is_recording);
        let chunks_relayed = Arc::clone(&self.chunks_relayed);
        let capture_rate = Arc::clone(&self.capture_rate);
        let captured = Arc::clone(&self.captured);
        let retain_audio = self.config.retain_audio;

        let relay_task = tokio::spawn(async move {
            info!("audio relay task started");

            while let Some(chunk) = chunk_rx.recv().await {
                if !is_recording.load(Ordering::SeqCst) {
                    break;
                }

                capture_rate.store(chunk.sample_rate, Ordering::SeqCst);

                {
                    let recognizer = recognizer.lock().await;
                    recognizer.send(&chunk.samples, chunk.sample_rate);
                }

                if retain_audio {
                    captured.lock().await.push(chunk.samples);
                }

                chunks_relayed.fetch_add(1, Ordering::SeqCst);
            }

            info!("audio relay task stopped");
        });

        {
            let mut handle = self.relay_task_handle.lock().await;
            *handle = Some(relay_task);
        }

        // Forward client events outward, accumulating finalized text
        let (outward_tx, outward_rx) = mpsc::unbounded_channel();
        let transcript = Arc::clone(&self.transcript);
        let final_results = Arc::clone(&self.final_results);

        let event_task = tokio::spawn(async move {
            info!("recognition event task started");

            let mut client_rx = client_rx;
            while let Some(event) = client_rx.recv().await {
                if let ClientEvent::Recognition { text: Some(text) } = &event {
                    if !text.is_empty() {
                        transcript.lock().await.push_str(text);
                        final_results.fetch_add(1, Ordering::SeqCst);
                    }
                }

                let closed = matches!(event, ClientEvent::Closed { .. });
                let _ = outward_tx.send(event);
                if closed {
                    break;
                }
            }

            info!("recognition event task stopped");
        });

        {
            let mut handle = self.event_task_handle.lock().await;
            *handle = Some(event_task);
        }

        info!("Recognition session started successfully");

        Ok(outward_rx)
    }

    /// Stop recognizing. Idempotent: signals end-of-stream to the client
    /// (the buffer still drains and the terminal marker goes out), halts
    /// capture so nothing further is enqueued, and waits for the client
    /// to finish.
    pub async fn stop(&self) -> Result<SessionStats, SessionError> {
        if !self.is_recording.swap(false, Ordering::SeqCst) {
            warn!("recognition not active");
            return Ok(self.stats().await);
        }

        info!("Stopping recognition session: {}", self.config.session_id);

        {
            let recognizer = self.recognizer.lock().await;
            recognizer.stop();
        }

        {
            let mut capture = self.capture.lock().await;
            if let Err(e) = capture.stop().await {
                error!("failed to stop capture: {}", e);
            }
        }

        {
            let mut handle = self.relay_task_handle.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    error!("audio relay task panicked: {}", e);
                }
            }
        }

        {
            let mut handle = self.event_task_handle.lock().await;
            if let Some(task) = handle.take() {
                // The event task ends when the client reports Closed
                match tokio::time::timeout(Duration::from_secs(10), task).await {
                    Ok(Err(e)) => error!("recognition event task panicked: {}", e),
                    Err(_) => warn!("recognition event task did not finish in time"),
                    Ok(Ok(())) => {}
                }
            }
        }

        info!("Recognition session stopped successfully");

        Ok(self.stats().await)
    }

    /// Current session statistics
    pub async fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            is_recording: self.is_recording.load(Ordering::SeqCst),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_relayed: self.chunks_relayed.load(Ordering::SeqCst),
            final_results: self.final_results.load(Ordering::SeqCst),
        }
    }

    /// Accumulated finalized text
    pub async fn transcript(&self) -> String {
        self.transcript.lock().await.clone()
    }

    /// Convert the retained capture chunks into an MP3 byte blob
    /// (offline path).
    pub async fn captured_to_mp3(&self) -> Result<Vec<u8>, SessionError> {
        let chunks = self.captured.lock().await;
        if chunks.is_empty() {
            return Err(EncodeError::Encode("no captured audio".to_string()).into());
        }

        let sample_rate = self.capture_rate.load(Ordering::SeqCst);
        if sample_rate == 0 {
            return Err(EncodeError::Encode("unknown capture rate".to_string()).into());
        }

        let blob = encode::chunks_to_mp3(&chunks, sample_rate, self.config.mp3_bitrate_kbps)?;
        Ok(blob)
    }
}
