use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tutor::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECS};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Falls back to the TELEGRAM_TOKEN environment variable.
    #[serde(default)]
    telegram_bot_token: String,
    /// Falls back to the OPENAI_API_KEY environment variable.
    #[serde(default)]
    openai_api_key: String,
    #[serde(default = "default_model")]
    openai_model: String,
    #[serde(default = "default_base_url")]
    openai_base_url: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default = "default_cache_max_entries")]
    cache_max_entries: usize,
    #[serde(default = "default_cache_ttl_seconds")]
    cache_ttl_seconds: u64,
    /// Request timeout for the language model. No timeout when unset.
    llm_timeout_seconds: Option<u64>,
    /// Path to Whisper model file (.bin) for voice recognition.
    whisper_model_path: Option<String>,
    #[serde(default = "default_stt_language")]
    stt_language: String,
    /// Google Cloud API key for spoken replies.
    google_tts_api_key: Option<String>,
    #[serde(default = "default_tts_language")]
    tts_language_code: String,
    /// Directory for logs. Defaults to current directory.
    data_dir: Option<String>,
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_tokens() -> u32 {
    3000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_cache_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_cache_ttl_seconds() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_stt_language() -> String {
    "ru".to_string()
}

fn default_tts_language() -> String {
    "ru-RU".to_string()
}

pub struct Config {
    pub telegram_bot_token: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub cache_max_entries: usize,
    pub cache_ttl: Duration,
    pub llm_timeout: Option<Duration>,
    pub whisper_model_path: Option<PathBuf>,
    pub stt_language: String,
    pub google_tts_api_key: Option<String>,
    pub tts_language_code: String,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
}

impl Config {
    /// Load from a JSON file, filling secrets from the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    fn load_with_env<P, F>(path: P, env: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let telegram_bot_token = non_empty(file.telegram_bot_token)
            .or_else(|| env("TELEGRAM_TOKEN"))
            .unwrap_or_default();
        let openai_api_key = non_empty(file.openai_api_key)
            .or_else(|| env("OPENAI_API_KEY"))
            .unwrap_or_default();

        if telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }
        if openai_api_key.is_empty() {
            return Err(ConfigError::Validation("openai_api_key is required".into()));
        }
        if !(0.0..=2.0).contains(&file.temperature) {
            return Err(ConfigError::Validation("temperature must be between 0 and 2".into()));
        }
        if file.cache_max_entries == 0 {
            return Err(ConfigError::Validation("cache_max_entries must be positive".into()));
        }
        if file.cache_ttl_seconds == 0 {
            return Err(ConfigError::Validation("cache_ttl_seconds must be positive".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            openai_api_key,
            openai_model: file.openai_model,
            openai_base_url: file.openai_base_url,
            max_tokens: file.max_tokens,
            temperature: file.temperature,
            cache_max_entries: file.cache_max_entries,
            cache_ttl: Duration::from_secs(file.cache_ttl_seconds),
            llm_timeout: file.llm_timeout_seconds.map(Duration::from_secs),
            whisper_model_path: file.whisper_model_path.map(PathBuf::from),
            stt_language: file.stt_language,
            google_tts_api_key: file.google_tts_api_key.and_then(non_empty),
            tts_language_code: file.tts_language_code,
            data_dir,
        })
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn load(file: &NamedTempFile) -> Result<Config, ConfigError> {
        Config::load_with_env(file.path(), no_env)
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_with_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
            "openai_api_key": "sk-test"
        }"#);
        let config = load(&file).expect("should load valid config");
        assert_eq!(config.openai_model, "gpt-4");
        assert_eq!(config.max_tokens, 3000);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.cache_max_entries, 100);
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.llm_timeout, None);
        assert_eq!(config.stt_language, "ru");
        assert_eq!(config.tts_language_code, "ru-RU");
        assert!(config.whisper_model_path.is_none());
        assert!(config.google_tts_api_key.is_none());
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_overrides() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:x",
            "openai_api_key": "sk-test",
            "openai_model": "gpt-4o-mini",
            "cache_max_entries": 5,
            "cache_ttl_seconds": 30,
            "llm_timeout_seconds": 20,
            "whisper_model_path": "models/ggml-small.bin",
            "google_tts_api_key": "g-key",
            "data_dir": "/var/lib/tutor"
        }"#);
        let config = load(&file).unwrap();
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.cache_max_entries, 5);
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.llm_timeout, Some(Duration::from_secs(20)));
        assert_eq!(config.whisper_model_path, Some(PathBuf::from("models/ggml-small.bin")));
        assert_eq!(config.google_tts_api_key.as_deref(), Some("g-key"));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/tutor"));
    }

    #[test]
    fn test_secrets_from_env() {
        let file = write_config("{}");
        let config = Config::load_with_env(file.path(), |name| match name {
            "TELEGRAM_TOKEN" => Some("42:secret".to_string()),
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.telegram_bot_token, "42:secret");
        assert_eq!(config.openai_api_key, "sk-env");
    }

    #[test]
    fn test_file_wins_over_env() {
        let file = write_config(r#"{ "telegram_bot_token": "1:file", "openai_api_key": "sk-file" }"#);
        let config = Config::load_with_env(file.path(), |_| Some("99:env".to_string())).unwrap();
        assert_eq!(config.telegram_bot_token, "1:file");
        assert_eq!(config.openai_api_key, "sk-file");
    }

    #[test]
    fn test_missing_token() {
        let file = write_config(r#"{ "openai_api_key": "sk-test" }"#);
        let err = assert_err(load(&file));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["invalid_token_no_colon", "notanumber:ABCdef", "123456789:"] {
            let file = write_config(&format!(
                r#"{{ "telegram_bot_token": "{token}", "openai_api_key": "sk-test" }}"#
            ));
            let err = assert_err(load(&file));
            assert!(matches!(err, ConfigError::Validation(_)), "{token}");
        }
    }

    #[test]
    fn test_missing_openai_key() {
        let file = write_config(r#"{ "telegram_bot_token": "1:x" }"#);
        let err = assert_err(load(&file));
        assert!(err.to_string().contains("openai_api_key"));
    }

    #[test]
    fn test_invalid_cache_settings() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:x",
            "openai_api_key": "sk-test",
            "cache_max_entries": 0
        }"#);
        assert!(assert_err(load(&file)).to_string().contains("cache_max_entries"));

        let file = write_config(r#"{
            "telegram_bot_token": "1:x",
            "openai_api_key": "sk-test",
            "temperature": 3.5
        }"#);
        assert!(assert_err(load(&file)).to_string().contains("temperature"));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load_with_env("/nonexistent/path/tutor.json", no_env));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(load(&file));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
