// Tests for the recognition session: capture-before-handshake ordering,
// relay, transcript accumulation, and idempotent stop.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use speechwire::audio::{AudioChunk, CaptureSource};
use speechwire::client::{ClientEvent, SpeechRecognizer};
use speechwire::error::{CaptureError, ClientError, SessionError};
use speechwire::{RecognitionSession, SessionConfig};
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Capture source the test feeds by hand.
struct FakeCapture {
    chunk_tx: Arc<Mutex<Option<mpsc::Sender<AudioChunk>>>>,
    fail_with: Option<CaptureError>,
    capturing: bool,
}

impl FakeCapture {
    fn new() -> (Self, Arc<Mutex<Option<mpsc::Sender<AudioChunk>>>>) {
        let chunk_tx = Arc::new(Mutex::new(None));
        (
            Self {
                chunk_tx: Arc::clone(&chunk_tx),
                fail_with: None,
                capturing: false,
            },
            chunk_tx,
        )
    }

    fn failing(error: CaptureError) -> Self {
        Self {
            chunk_tx: Arc::new(Mutex::new(None)),
            fail_with: Some(error),
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for FakeCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if let Some(error) = self.fail_with.take() {
            return Err(error);
        }
        let (tx, rx) = mpsc::channel(16);
        *self.chunk_tx.lock().unwrap() = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        *self.chunk_tx.lock().unwrap() = None;
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "fake capture"
    }
}

/// Recognizer that records what the session does to it and lets the test
/// emit client events.
struct FakeRecognizer {
    started: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    samples_received: Arc<AtomicUsize>,
    event_tx: Arc<Mutex<Option<mpsc::UnboundedSender<ClientEvent>>>>,
}

#[derive(Clone)]
struct FakeRecognizerHandle {
    started: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    samples_received: Arc<AtomicUsize>,
    event_tx: Arc<Mutex<Option<mpsc::UnboundedSender<ClientEvent>>>>,
}

impl FakeRecognizer {
    fn new() -> (Self, FakeRecognizerHandle) {
        let started = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));
        let samples_received = Arc::new(AtomicUsize::new(0));
        let event_tx = Arc::new(Mutex::new(None));
        let handle = FakeRecognizerHandle {
            started: Arc::clone(&started),
            stopped: Arc::clone(&stopped),
            samples_received: Arc::clone(&samples_received),
            event_tx: Arc::clone(&event_tx),
        };
        (
            Self {
                started,
                stopped,
                samples_received,
                event_tx,
            },
            handle,
        )
    }
}

impl FakeRecognizerHandle {
    fn emit(&self, event: ClientEvent) {
        if let Some(tx) = self.event_tx.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<ClientEvent>, ClientError> {
        self.started.store(true, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        *self.event_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn send(&self, samples: &[f32], _sample_rate: u32) {
        self.samples_received
            .fetch_add(samples.len(), Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

fn test_session_config() -> SessionConfig {
    SessionConfig {
        session_id: "session-test".to_string(),
        retain_audio: true,
        mp3_bitrate_kbps: 128,
    }
}

#[tokio::test(start_paused = true)]
async fn test_capture_failure_prevents_handshake() {
    let capture = FakeCapture::failing(CaptureError::PermissionDenied(
        "microphone use not allowed".to_string(),
    ));
    let (recognizer, handle) = FakeRecognizer::new();

    let session = RecognitionSession::new(
        test_session_config(),
        Box::new(capture),
        Box::new(recognizer),
    );

    let result = session.start().await;
    assert!(matches!(
        result,
        Err(SessionError::Capture(CaptureError::PermissionDenied(_)))
    ));
    assert!(
        !handle.started.load(Ordering::SeqCst),
        "a failed capture must never reach the handshake"
    );
}

#[tokio::test(start_paused = true)]
async fn test_device_unavailable_is_distinguished() {
    let capture = FakeCapture::failing(CaptureError::DeviceUnavailable(
        "no input device".to_string(),
    ));
    let (recognizer, _handle) = FakeRecognizer::new();

    let session = RecognitionSession::new(
        test_session_config(),
        Box::new(capture),
        Box::new(recognizer),
    );

    let result = session.start().await;
    assert!(matches!(
        result,
        Err(SessionError::Capture(CaptureError::DeviceUnavailable(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_session_relays_chunks_and_accumulates_transcript() {
    let (capture, chunk_tx) = FakeCapture::new();
    let (recognizer, handle) = FakeRecognizer::new();

    let session = RecognitionSession::new(
        test_session_config(),
        Box::new(capture),
        Box::new(recognizer),
    );

    let mut events = session.start().await.unwrap();
    assert!(handle.started.load(Ordering::SeqCst));

    // Feed two capture chunks
    let tx = chunk_tx.lock().unwrap().as_ref().unwrap().clone();
    tx.send(AudioChunk {
        samples: vec![0.1f32; 800],
        sample_rate: 44100,
    })
    .await
    .unwrap();
    tx.send(AudioChunk {
        samples: vec![0.2f32; 800],
        sample_rate: 44100,
    })
    .await
    .unwrap();
    sleep(Duration::from_millis(50)).await;

    assert_eq!(handle.samples_received.load(Ordering::SeqCst), 1600);

    // Finalized text accumulates; absent and empty text is filtered
    handle.emit(ClientEvent::Recognition {
        text: Some("你好".to_string()),
    });
    handle.emit(ClientEvent::Recognition { text: None });
    handle.emit(ClientEvent::Recognition {
        text: Some(String::new()),
    });
    handle.emit(ClientEvent::Recognition {
        text: Some("世界".to_string()),
    });
    handle.emit(ClientEvent::Closed { requested: true });
    sleep(Duration::from_millis(50)).await;

    assert_eq!(session.transcript().await, "你好世界");

    // Release the test's sender so the relay task can wind down
    drop(tx);
    let stats = session.stop().await.unwrap();
    assert!(!stats.is_recording);
    assert_eq!(stats.chunks_relayed, 2);
    assert_eq!(stats.final_results, 2);
    assert!(handle.stopped.load(Ordering::SeqCst));

    // Outward events were forwarded, terminating with the close
    let mut forwarded = 0;
    let mut closed = false;
    while let Ok(event) = events.try_recv() {
        forwarded += 1;
        if matches!(event, ClientEvent::Closed { .. }) {
            closed = true;
        }
    }
    assert!(forwarded >= 5);
    assert!(closed);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let (capture, _chunk_tx) = FakeCapture::new();
    let (recognizer, handle) = FakeRecognizer::new();

    let session = RecognitionSession::new(
        test_session_config(),
        Box::new(capture),
        Box::new(recognizer),
    );

    let _events = session.start().await.unwrap();
    handle.emit(ClientEvent::Closed { requested: true });

    let first = session.stop().await.unwrap();
    assert!(!first.is_recording);

    // Second stop is a no-op, not an error
    let second = session.stop().await.unwrap();
    assert!(!second.is_recording);
}

#[tokio::test(start_paused = true)]
async fn test_start_while_running_is_rejected() {
    let (capture, _chunk_tx) = FakeCapture::new();
    let (recognizer, handle) = FakeRecognizer::new();

    let session = RecognitionSession::new(
        test_session_config(),
        Box::new(capture),
        Box::new(recognizer),
    );

    let _events = session.start().await.unwrap();
    assert!(matches!(
        session.start().await,
        Err(SessionError::AlreadyRunning)
    ));

    handle.emit(ClientEvent::Closed { requested: true });
    session.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_captured_audio_is_retained_for_mp3() {
    let (capture, chunk_tx) = FakeCapture::new();
    let (recognizer, handle) = FakeRecognizer::new();

    let session = RecognitionSession::new(
        test_session_config(),
        Box::new(capture),
        Box::new(recognizer),
    );

    let _events = session.start().await.unwrap();

    let tx = chunk_tx.lock().unwrap().as_ref().unwrap().clone();
    // Enough for a handful of MP3 frames
    tx.send(AudioChunk {
        samples: vec![0.0f32; 1152 * 6],
        sample_rate: 44100,
    })
    .await
    .unwrap();
    sleep(Duration::from_millis(50)).await;

    drop(tx);
    handle.emit(ClientEvent::Closed { requested: true });
    session.stop().await.unwrap();

    let blob = session.captured_to_mp3().await.unwrap();
    assert!(!blob.is_empty(), "retained audio must encode to a non-empty blob");
}

#[tokio::test(start_paused = true)]
async fn test_mp3_conversion_without_audio_fails() {
    let (capture, _chunk_tx) = FakeCapture::new();
    let (recognizer, handle) = FakeRecognizer::new();

    let session = RecognitionSession::new(
        test_session_config(),
        Box::new(capture),
        Box::new(recognizer),
    );

    let _events = session.start().await.unwrap();
    handle.emit(ClientEvent::Closed { requested: true });
    session.stop().await.unwrap();

    assert!(session.captured_to_mp3().await.is_err());
}
