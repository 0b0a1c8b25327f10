//! OpenAI chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::tutor::services::{LanguageModel, UpstreamError};

/// System prompt sent before every question.
pub const TUTOR_PERSONA: &str =
    "Ты — учитель испанского языка. Отвечай на вопросы максимально кратко, четко и по существу.";

/// Client settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Option<Duration>,
}

pub struct Client {
    config: LlmConfig,
    http: reqwest::Client,
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    System,
    User,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl Client {
    pub fn new(config: LlmConfig) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// Send a conversation and return the first choice, trimmed.
    pub async fn complete(&self, messages: &[(Role, &str)]) -> Result<String, Error> {
        let request = ApiRequest {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|&(role, content)| ApiMessage { role: role.as_str(), content })
                .collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parse_answer(api_response)
    }
}

fn parse_answer(response: ApiResponse) -> Result<String, Error> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(Error::Empty)
}

#[async_trait]
impl LanguageModel for Client {
    async fn ask(&self, prompt: &str) -> Result<String, UpstreamError> {
        debug!("Asking {} ({} chars)", self.config.model, prompt.len());
        self.complete(&[(Role::System, TUTOR_PERSONA), (Role::User, prompt)])
            .await
            .map_err(|e| {
                error!("OpenAI request failed: {e}");
                UpstreamError(e.to_string())
            })
    }
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ApiRequest {
            model: "gpt-4",
            messages: vec![
                ApiMessage { role: Role::System.as_str(), content: TUTOR_PERSONA },
                ApiMessage { role: Role::User.as_str(), content: "¿Qué es 'gato'?" },
            ],
            max_tokens: 3000,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "¿Qué es 'gato'?");
        assert_eq!(json["max_tokens"], 3000);
        assert_eq!(json["temperature"], 0.5);
    }

    #[test]
    fn test_parse_answer_trims() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Gato — кошка.\n"}}]}"#,
        )
        .unwrap();
        assert_eq!(parse_answer(response).unwrap(), "Gato — кошка.");
    }

    #[test]
    fn test_parse_answer_empty() {
        let response: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(parse_answer(response), Err(Error::Empty)));

        let response: ApiResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(parse_answer(response), Err(Error::Empty)));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::Api("429: quota".into()).to_string(), "API error: 429: quota");
        assert_eq!(Error::Empty.to_string(), "Empty response");
    }
}
