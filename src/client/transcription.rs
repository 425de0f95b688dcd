// Transcription protocol client: continuous recognition over raw binary
// audio frames with a JSON control channel. Unlike dictation, any close
// or error is terminal; the variant never reconnects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::buffer::TransmissionBuffer;
use super::messages::{end_frame, TranscriptionData, TranscriptionEnvelope};
use super::pacing::{PaceStep, Pacer, PACE_INTERVAL};
use super::signing::SigningContext;
use super::transport::{SocketTransport, TransportEvent, WireFrame};
use super::{ClientEvent, ClientState, Command, SpeechRecognizer};
use crate::audio::resample::{decimate, pcm_bytes, quantize_i16, STREAM_SAMPLE_RATE};
use crate::config::{Credentials, TranscriptionConfig};
use crate::error::ClientError;

pub struct TranscriptionClient {
    config: TranscriptionConfig,
    credentials: Credentials,
    transport: Arc<dyn SocketTransport>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: Option<mpsc::UnboundedReceiver<Command>>,
    stopped: Arc<AtomicBool>,
}

impl TranscriptionClient {
    pub fn new(
        config: TranscriptionConfig,
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
impl SpeechRecognizer for TranscriptionClient {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<ClientEvent>, ClientError> {
        let cmd_rx = self
            .cmd_rx
            .take()
            .ok_or_else(|| ClientError::Handshake("client already started".to_string()))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = TranscriptionTask {
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
        // This variant's historical transform: plain decimation
        let decimated = decimate(samples, sample_rate, STREAM_SAMPLE_RATE);
        let pcm = pcm_bytes(&quantize_i16(&decimated));
        let _ = self.cmd_tx.send(Command::Audio(pcm));
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.cmd_tx.send(Command::Stop);
    }
}

struct TranscriptionTask {
    config: TranscriptionConfig,
    credentials: Credentials,
    transport: Arc<dyn SocketTransport>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl TranscriptionTask {
    async fn run(self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        let mut state = ClientState::Connecting;
        debug!("transcription client state: {:?}", state);

        let signing = SigningContext::new(&self.credentials);
        let url = match signing.transcription_url(&self.config.endpoint) {
            Ok(url) => url,
            Err(e) => {
                error!("failed to sign transcription URL: {}", e);
                let _ = self.events.send(ClientEvent::Error(e));
                let _ = self.events.send(ClientEvent::Closed { requested: false });
                return;
            }
        };

        let mut conn = match self.transport.connect(&url).await {
            Ok(conn) => conn,
            Err(e) => {
                error!("transcription handshake failed: {}", e);
                let _ = self.events.send(ClientEvent::Error(e));
                let _ = self.events.send(ClientEvent::Closed { requested: false });
                return;
            }
        };

        let mut buffer = TransmissionBuffer::new();
        let mut pacer = Pacer::new();
        let mut stopped = false;
        let mut cmd_open = true;
        let mut end_sent = false;
        // Audio may not flow until the service acknowledges the stream
        let mut streaming = false;
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
                        match serde_json::from_str::<TranscriptionEnvelope>(&text) {
                            Ok(envelope) => match envelope.action.as_str() {
                                "started" => {
                                    streaming = true;
                                    state = ClientState::Streaming;
                                    debug!("transcription client state: {:?}", state);
                                    info!("transcription stream acknowledged");
                                    let _ = self.events.send(ClientEvent::Started);
                                }
                                "result" => {
                                    match serde_json::from_str::<TranscriptionData>(&envelope.data) {
                                        Ok(data) if data.is_final() => {
                                            let _ = self.events.send(ClientEvent::Recognition {
                                                text: data.text(),
                                            });
                                        }
                                        Ok(_) => {
                                            // Interim results never reach the
                                            // public event stream
                                            debug!("discarding interim result");
                                        }
                                        Err(e) => {
                                            warn!("skipping malformed result payload: {}", e);
                                        }
                                    }
                                }
                                "error" => {
                                    let err = ClientError::Protocol {
                                        code: envelope.code.parse().unwrap_or(-1),
                                        message: envelope.desc.clone(),
                                    };
                                    error!("transcription service error: {}", err);
                                    let _ = self.events.send(ClientEvent::Error(err));
                                    conn.close().await;
                                    state = ClientState::Closed;
                                    debug!("transcription client state: {:?}", state);
                                    let _ = self.events.send(ClientEvent::Closed { requested: false });
                                    return;
                                }
                                other => {
                                    warn!("unknown transcription action: {}", other);
                                }
                            },
                            Err(e) => {
                                warn!("skipping malformed transcription message: {}", e);
                            }
                        }
                    }
                    Some(TransportEvent::Message(WireFrame::Binary(_))) => {
                        warn!("unexpected binary frame on transcription control channel");
                    }
                    Some(TransportEvent::Error(e)) => {
                        warn!("transcription transport error: {}", e);
                        // Terminal for this variant; Closed follows
                    }
                    Some(TransportEvent::Closed) | None => {
                        state = ClientState::Closed;
                        debug!("transcription client state: {:?}", state);
                        if stopped || end_sent {
                            let _ = self.events.send(ClientEvent::Closed { requested: true });
                        } else {
                            let _ = self
                                .events
                                .send(ClientEvent::Error(ClientError::UnexpectedClose));
                            let _ = self.events.send(ClientEvent::Closed { requested: false });
                        }
                        return;
                    }
                },

                _ = interval.tick() => {
                    if !streaming || !conn.is_open() {
                        continue;
                    }
                    match pacer.step(&mut buffer, stopped) {
                        PaceStep::Send(slice) => {
                            if let Err(e) = conn.send(WireFrame::Binary(slice)).await {
                                warn!("failed to send audio frame: {}", e);
                            }
                        }
                        PaceStep::Finish => {
                            state = ClientState::Draining;
                            debug!("transcription client state: {:?}", state);
                            if let Err(e) = conn.send(WireFrame::Text(end_frame())).await {
                                warn!("failed to send end-of-stream marker: {}", e);
                            }
                            end_sent = true;
                        }
                        PaceStep::Idle => {}
                    }
                }
            }
        }
    }
}
