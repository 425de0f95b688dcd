use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speechwire::client::{DictationClient, SpeechRecognizer, TranscriptionClient, WebSocketTransport};
use speechwire::{ClientEvent, Config, MicCapture, RecognitionSession, SessionConfig};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "speechwire", about = "Stream microphone audio to a speech recognition service")]
struct Cli {
    /// Config file (without extension)
    #[arg(long, default_value = "config/speechwire")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Single-utterance dictation
    Dictate {
        /// Write the captured audio as MP3 when the session ends
        #[arg(long)]
        mp3_out: Option<PathBuf>,
    },
    /// Continuous transcription
    Transcribe {
        /// Write the captured audio as MP3 when the session ends
        #[arg(long)]
        mp3_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config).context("Failed to load config")?;

    info!("{} starting", cfg.service.name);

    let transport = Arc::new(WebSocketTransport::new());

    let (recognizer, mp3_out): (Box<dyn SpeechRecognizer>, Option<PathBuf>) = match cli.command {
        Command::Dictate { mp3_out } => (
            Box::new(DictationClient::new(
                cfg.dictation.clone(),
                cfg.credentials.clone(),
                transport,
            )),
            mp3_out,
        ),
        Command::Transcribe { mp3_out } => (
            Box::new(TranscriptionClient::new(
                cfg.transcription.clone(),
                cfg.credentials.clone(),
                transport,
            )),
            mp3_out,
        ),
    };

    let session_config = SessionConfig {
        retain_audio: mp3_out.is_some(),
        mp3_bitrate_kbps: cfg.audio.mp3_bitrate_kbps,
        ..SessionConfig::default()
    };

    let session = RecognitionSession::new(session_config, Box::new(MicCapture::new()), recognizer);

    let mut events = session.start().await.context("Failed to start session")?;

    info!("listening; press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("stop requested");
                break;
            }
            event = events.recv() => match event {
                Some(ClientEvent::Recognition { text: Some(text) }) if !text.is_empty() => {
                    println!("{}", text);
                }
                Some(ClientEvent::Error(e)) => {
                    warn!("recognition error: {}", e);
                }
                Some(ClientEvent::Closed { requested }) => {
                    info!("stream closed (requested: {})", requested);
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }
    }

    let stats = session.stop().await?;
    info!(
        "session finished: {:.1}s, {} chunks, {} final results",
        stats.duration_secs, stats.chunks_relayed, stats.final_results
    );

    let transcript = session.transcript().await;
    if !transcript.is_empty() {
        println!("--- transcript ---");
        println!("{}", transcript);
    }

    if let Some(path) = mp3_out {
        let blob = session
            .captured_to_mp3()
            .await
            .context("Failed to encode captured audio")?;
        std::fs::write(&path, &blob)
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!("wrote {} MP3 bytes to {:?}", blob.len(), path);
    }

    Ok(())
}
