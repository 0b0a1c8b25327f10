//! Contracts for the outside world: language model, speech and chat delivery.

use std::fmt;

use async_trait::async_trait;

use crate::tutor::router::Keyboard;

/// The language model could not answer (network, auth, quota).
#[derive(Debug)]
pub struct UpstreamError(pub String);

/// Audio could not be turned into text.
#[derive(Debug)]
pub struct RecognitionError(pub String);

/// Text could not be turned into audio.
#[derive(Debug)]
pub struct SynthesisError(pub String);

/// A chat operation failed.
#[derive(Debug)]
pub struct TransportError(pub String);

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "language model unavailable: {}", self.0)
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speech recognition failed: {}", self.0)
    }
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speech synthesis failed: {}", self.0)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chat transport error: {}", self.0)
    }
}

impl std::error::Error for UpstreamError {}
impl std::error::Error for RecognitionError {}
impl std::error::Error for SynthesisError {}
impl std::error::Error for TransportError {}

/// Answers free-form questions in the tutor persona.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, UpstreamError>;
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, language_hint: &str) -> Result<String, RecognitionError>;
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Returns OGG Opus audio.
    async fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// Message delivery. Callers log failures and never retry.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, user_id: i64, text: &str, keyboard: Keyboard) -> Result<(), TransportError>;
    async fn send_voice(&self, user_id: i64, audio: Vec<u8>) -> Result<(), TransportError>;
    async fn send_typing_indicator(&self, user_id: i64) -> Result<(), TransportError>;
    async fn send_recording_indicator(&self, user_id: i64) -> Result<(), TransportError>;
    async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, TransportError>;
}
