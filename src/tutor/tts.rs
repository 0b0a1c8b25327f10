//! Text-to-speech using the Google Cloud Text-to-Speech REST API.
//!
//! Audio is requested as OGG Opus, which Telegram plays as a voice note
//! without any transcoding.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::tutor::services::{SynthesisError, TextToSpeech};

const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct VoiceSelection<'a> {
    #[serde(rename = "languageCode")]
    language_code: &'a str,
    #[serde(rename = "ssmlGender")]
    ssml_gender: &'static str,
}

#[derive(Serialize)]
struct AudioConfig {
    #[serde(rename = "audioEncoding")]
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

/// TTS client for Google Cloud.
pub struct TtsClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl TtsClient {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, GOOGLE_TTS_URL.to_string())
    }

    pub fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self {
            api_key,
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

fn build_request<'a>(text: &'a str, language_code: &'a str) -> SynthesizeRequest<'a> {
    SynthesizeRequest {
        input: SynthesisInput { text },
        voice: VoiceSelection {
            language_code,
            ssml_gender: "NEUTRAL",
        },
        audio_config: AudioConfig {
            audio_encoding: "OGG_OPUS",
        },
    }
}

fn decode_audio(response: SynthesizeResponse) -> Result<Vec<u8>, String> {
    let audio = base64::engine::general_purpose::STANDARD
        .decode(response.audio_content)
        .map_err(|e| format!("Invalid audio payload: {e}"))?;
    if audio.is_empty() {
        return Err("Empty audio payload".to_string());
    }
    Ok(audio)
}

#[async_trait]
impl TextToSpeech for TtsClient {
    async fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>, SynthesisError> {
        let preview: String = text.chars().take(50).collect();
        info!("🔊 TTS: \"{}\"", preview);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&build_request(text, language_code))
            .send()
            .await
            .map_err(|e| SynthesisError(format!("TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError(format!("TTS error {}: {}", status, body)));
        }

        let body: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError(format!("Failed to parse TTS response: {e}")))?;

        let audio = decode_audio(body).map_err(SynthesisError)?;
        debug!("Got {} bytes of OGG audio", audio.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tts_client_creation() {
        let client = TtsClient::new("key".to_string());
        assert_eq!(client.endpoint, GOOGLE_TTS_URL);
    }

    #[test]
    fn test_request_body() {
        let json = serde_json::to_value(build_request("Hola", "ru-RU")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "input": { "text": "Hola" },
                "voice": { "languageCode": "ru-RU", "ssmlGender": "NEUTRAL" },
                "audioConfig": { "audioEncoding": "OGG_OPUS" }
            })
        );
    }

    #[test]
    fn test_decode_audio() {
        let response = SynthesizeResponse { audio_content: "T2dnUw==".to_string() };
        assert_eq!(decode_audio(response).unwrap(), b"OggS");

        let response = SynthesizeResponse { audio_content: "not base64!".to_string() };
        assert!(decode_audio(response).is_err());

        let response = SynthesizeResponse { audio_content: String::new() };
        assert!(decode_audio(response).is_err());
    }
}
