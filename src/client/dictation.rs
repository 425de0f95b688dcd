// Dictation protocol client: single-utterance recognition with explicit
// first/middle/last frame status codes and reconnect-on-unexpected-close.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::buffer::TransmissionBuffer;
use super::messages::{DictationFrame, DictationResponse};
use super::pacing::{PaceStep, Pacer, PACE_INTERVAL};
use super::signing::SigningContext;
use super::transport::{SocketTransport, TransportEvent, WireFrame};
use super::{ClientEvent, ClientState, Command, SpeechRecognizer};
use crate::audio::resample::transform_for_streaming;
use crate::config::{Credentials, DictationConfig};
use crate::error::ClientError;

/// Consecutive failed handshake attempts tolerated before the client
/// gives up. A successful handshake resets the count.
const MAX_HANDSHAKE_ATTEMPTS: u32 = 3;

pub struct DictationClient {
    config: DictationConfig,
    credentials: Credentials,
    transport: Arc<dyn SocketTransport>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: Option<mpsc::UnboundedReceiver<Command>>,
    stopped: Arc<AtomicBool>,
}

impl DictationClient {
    pub fn new(
        config: DictationConfig,
        credentials: Credentials,
        transport: Arc<dyn SocketTransport>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        Self {
            config,
            credentials,
            transport,
            cmd_tx,
            cmd_rx: Some(cmd_rx),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for DictationClient {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<ClientEvent>, ClientError> {
        let cmd_rx = self
            .cmd_rx
            .take()
            .ok_or_else(|| ClientError::Handshake("client already started".to_string()))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = DictationTask {
            config: self.config.clone(),
            credentials: self.credentials.clone(),
            transport: Arc::clone(&self.transport),
            events: event_tx,
        };
        tokio::spawn(task.run(cmd_rx));

        Ok(event_rx)
    }

    fn send(&self, samples: &[f32], sample_rate: u32) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let pcm = transform_for_streaming(samples, sample_rate);
        let _ = self.cmd_tx.send(Command::Audio(pcm));
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.cmd_tx.send(Command::Stop);
    }
}

struct DictationTask {
    config: DictationConfig,
    credentials: Credentials,
    transport: Arc<dyn SocketTransport>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl DictationTask {
    async fn run(self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        // The buffer outlives individual connections: bytes accumulated
        // before an unexpected close ride over into the next attempt.
        let mut buffer = TransmissionBuffer::new();
        let mut stopped = false;
        let mut cmd_open = true;
        let mut handshake_failures = 0u32;
        let mut state = ClientState::Idle;
        debug!("dictation client state: {:?}", state);

        'connection: loop {
            state = ClientState::Connecting;
            debug!("dictation client state: {:?}", state);

            // Fresh signing context on every attempt
            let signing = SigningContext::new(&self.credentials);
            let url = match signing.dictation_url(&self.config.endpoint) {
                Ok(url) => url,
                Err(e) => {
                    error!("failed to sign dictation URL: {}", e);
                    let _ = self.events.send(ClientEvent::Error(e));
                    break 'connection;
                }
            };

            let mut conn = match self.transport.connect(&url).await {
                Ok(conn) => {
                    handshake_failures = 0;
                    conn
                }
                Err(e) => {
                    handshake_failures += 1;
                    warn!(
                        "dictation handshake failed (attempt {}): {}",
                        handshake_failures, e
                    );
                    if handshake_failures >= MAX_HANDSHAKE_ATTEMPTS {
                        let _ = self.events.send(ClientEvent::Error(e));
                        break 'connection;
                    }
                    continue 'connection;
                }
            };

            state = ClientState::Streaming;
            debug!("dictation client state: {:?}", state);
            info!("dictation stream open");
            let _ = self.events.send(ClientEvent::Started);

            let mut pacer = Pacer::new();
            let mut first_frame = true;
            let mut end_sent = false;
            let mut interval = tokio::time::interval(PACE_INTERVAL);

            loop {
                tokio::select! {
                    cmd = cmd_rx.recv(), if cmd_open => match cmd {
                        Some(Command::Audio(bytes)) => {
                            if !stopped {
                                buffer.append(&bytes);
                            }
                        }
                        Some(Command::Stop) => {
                            stopped = true;
                        }
                        None => {
                            stopped = true;
                            cmd_open = false;
                        }
                    },

                    event = conn.recv() => match event {
                        Some(TransportEvent::Message(WireFrame::Text(text))) => {
                            match serde_json::from_str::<DictationResponse>(&text) {
                                Ok(response) if response.code != 0 => {
                                    let err = ClientError::Protocol {
                                        code: response.code,
                                        message: response.message.clone(),
                                    };
                                    error!("dictation service rejected stream: {}", err);
                                    let _ = self.events.send(ClientEvent::Error(err));
                                    conn.close().await;
                                    state = ClientState::Closed;
                                    debug!("dictation client state: {:?}", state);
                                    let _ = self.events.send(ClientEvent::Closed { requested: false });
                                    return;
                                }
                                Ok(response) => {
                                    let _ = self.events.send(ClientEvent::Recognition {
                                        text: response.text(),
                                    });
                                }
                                Err(e) => {
                                    // Best-effort decoding: skip, never fatal
                                    warn!("skipping malformed dictation message: {}", e);
                                }
                            }
                        }
                        Some(TransportEvent::Message(WireFrame::Binary(_))) => {
                            warn!("unexpected binary frame on dictation stream");
                        }
                        Some(TransportEvent::Error(e)) => {
                            warn!("dictation transport error: {}", e);
                            // A Closed event follows from the transport
                        }
                        Some(TransportEvent::Closed) | None => {
                            if stopped || end_sent {
                                state = ClientState::Closed;
                                debug!("dictation client state: {:?}", state);
                                let _ = self.events.send(ClientEvent::Closed { requested: true });
                                return;
                            }
                            // Transient: re-sign and re-handshake, keeping
                            // buffered audio intact
                            warn!(
                                "dictation stream closed unexpectedly, reconnecting ({} bytes buffered)",
                                buffer.len()
                            );
                            continue 'connection;
                        }
                    },

                    _ = interval.tick() => {
                        if !conn.is_open() {
                            continue;
                        }
                        match pacer.step(&mut buffer, stopped) {
                            PaceStep::Send(slice) => {
                                let frame = if first_frame {
                                    first_frame = false;
                                    DictationFrame::first(
                                        &self.credentials.app_id,
                                        &self.config,
                                        &slice,
                                    )
                                } else {
                                    DictationFrame::middle(&slice)
                                };
                                if let Err(e) = send_json(conn.as_mut(), &frame).await {
                                    warn!("failed to send audio frame: {}", e);
                                }
                            }
                            PaceStep::Finish => {
                                state = ClientState::Draining;
                                debug!("dictation client state: {:?}", state);
                                if let Err(e) = send_json(conn.as_mut(), &DictationFrame::last()).await {
                                    warn!("failed to send terminal frame: {}", e);
                                }
                                end_sent = true;
                            }
                            PaceStep::Idle => {}
                        }
                    }
                }
            }
        }

        let _ = self.events.send(ClientEvent::Closed { requested: stopped });
    }
}

async fn send_json(
    conn: &mut dyn super::transport::SocketConnection,
    frame: &DictationFrame,
) -> Result<(), ClientError> {
    let text = serde_json::to_string(frame)
        .map_err(|e| ClientError::Transport(format!("serialize frame: {}", e)))?;
    conn.send(WireFrame::Text(text)).await
}
