//! Speech-to-text using whisper-rs.
//!
//! Telegram voice notes arrive as OGG Opus; they are converted to 16 kHz mono
//! PCM with ffmpeg before inference.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::tutor::services::{RecognitionError, SpeechToText};

/// Whisper transcription engine.
#[derive(Clone)]
pub struct Whisper {
    ctx: Arc<WhisperContext>,
}

impl Whisper {
    /// Load a Whisper model from a .bin file.
    pub fn new(model_path: &Path) -> Result<Self, String> {
        info!("Loading Whisper model from {:?}", model_path);

        if !model_path.exists() {
            return Err(format!("Model file not found: {:?}", model_path));
        }

        let ctx = WhisperContext::new_with_params(
            model_path.to_str().ok_or("Invalid model path")?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| format!("Failed to load Whisper model: {e}"))?;

        info!("Whisper model loaded");
        Ok(Self { ctx: Arc::new(ctx) })
    }

    /// Transcribe OGG Opus audio. Blocking; run off the async runtime.
    pub fn transcribe_blocking(&self, ogg_data: &[u8], language: &str) -> Result<String, String> {
        debug!("Transcribing {} bytes of audio ({language})", ogg_data.len());

        let pcm_data = convert_ogg_to_pcm(ogg_data)?;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| format!("Failed to create Whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(language));
        params.set_translate(false);
        params.set_no_timestamps(true);
        params.set_single_segment(false);

        state
            .full(params, &pcm_data)
            .map_err(|e| format!("Whisper transcription failed: {e}"))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            if let Ok(s) = segment.to_str() {
                text.push_str(s);
                text.push(' ');
            }
        }

        let text = text.trim().to_string();
        info!("Transcribed: \"{}\"", truncate(&text, 100));
        Ok(text)
    }
}

#[async_trait]
impl SpeechToText for Whisper {
    async fn transcribe(&self, audio: Vec<u8>, language_hint: &str) -> Result<String, RecognitionError> {
        let whisper = self.clone();
        let language = language_hint.to_string();
        let text = tokio::task::spawn_blocking(move || whisper.transcribe_blocking(&audio, &language))
            .await
            .map_err(|e| RecognitionError(format!("transcription task failed: {e}")))?
            .map_err(RecognitionError)?;

        if text.is_empty() {
            return Err(RecognitionError("no speech detected".to_string()));
        }
        Ok(text)
    }
}

/// Convert OGG Opus audio to 16 kHz mono f32 PCM samples using ffmpeg.
fn convert_ogg_to_pcm(ogg_data: &[u8]) -> Result<Vec<f32>, String> {
    // ffmpeg wants a seekable input for OGG; each call gets its own file
    let mut input = tempfile::Builder::new()
        .prefix("voice_")
        .suffix(".ogg")
        .tempfile()
        .map_err(|e| format!("Failed to create temp input: {e}"))?;
    input
        .write_all(ogg_data)
        .map_err(|e| format!("Failed to write temp input: {e}"))?;

    let input_path = input.path().to_str().ok_or("Invalid temp path")?;

    let output = Command::new("ffmpeg")
        .args([
            "-i",
            input_path,
            "-ar",
            "16000",
            "-ac",
            "1",
            "-f",
            "s16le",
            "-acodec",
            "pcm_s16le",
            "-y",
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| format!("Failed to run ffmpeg: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("ffmpeg failed: {}", stderr));
    }

    let samples = pcm_s16le_to_f32(&output.stdout);
    debug!("Converted to {} f32 samples", samples.len());
    Ok(samples)
}

fn pcm_s16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}
