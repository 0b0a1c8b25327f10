use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use hola_tutor::config::Config;
use hola_tutor::tutor::llm::{Client as LlmClient, LlmConfig};
use hola_tutor::tutor::tts::TtsClient;
use hola_tutor::tutor::{
    Command, Incoming, ResponseCache, SessionRouter, TelegramClient, Tutor, TutorEngine, VOCABULARY,
    VoiceSettings, Whisper,
};

#[derive(BotCommands, Clone, Copy, Debug)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
enum BotCommand {
    #[command(description = "начать")]
    Start,
    #[command(description = "помощь")]
    Help,
    #[command(description = "завершить игру")]
    EndGame,
    #[command(description = "квиз")]
    Quiz,
    #[command(description = "слово дня")]
    Daily,
    #[command(description = "игра в слова")]
    WordGame,
    #[command(description = "выбрать уровень")]
    SetLevel,
}

impl From<BotCommand> for Command {
    fn from(command: BotCommand) -> Self {
        match command {
            BotCommand::Start => Command::Start,
            BotCommand::Help => Command::Help,
            BotCommand::EndGame => Command::EndGame,
            BotCommand::Quiz => Command::Quiz,
            BotCommand::Daily => Command::Daily,
            BotCommand::WordGame => Command::WordGame,
            BotCommand::SetLevel => Command::SetLevel,
        }
    }
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tutor.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Failed to create log directory {}: {e}", log_dir.display());
        std::process::exit(1);
    }
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("tutor.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file: {e}");
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting hola-tutor...");
    info!("Loaded config from {config_path}");

    let llm = match LlmClient::new(LlmConfig {
        api_key: config.openai_api_key.clone(),
        base_url: config.openai_base_url.clone(),
        model: config.openai_model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        timeout: config.llm_timeout,
    }) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create language model client: {e}");
            std::process::exit(1);
        }
    };
    info!("Language model: {}", config.openai_model);

    let bot = Bot::new(&config.telegram_bot_token);
    let transport = Arc::new(TelegramClient::new(bot.clone()));
    let cache = ResponseCache::new(config.cache_max_entries, config.cache_ttl);

    let mut tutor = Tutor::new(SessionRouter::new(VOCABULARY), cache, Arc::new(llm), transport)
        .with_voice_settings(VoiceSettings {
            stt_language: config.stt_language.clone(),
            tts_language: config.tts_language_code.clone(),
        });

    match config.whisper_model_path.as_deref() {
        Some(path) => match Whisper::new(path) {
            Ok(whisper) => {
                info!("🎤 Voice recognition enabled");
                tutor = tutor.with_speech_to_text(Arc::new(whisper));
            }
            Err(e) => warn!("Voice recognition disabled: {e}"),
        },
        None => info!("Voice recognition disabled (no whisper_model_path)"),
    }

    match config.google_tts_api_key.clone() {
        Some(key) => {
            info!("🔊 Spoken replies enabled");
            tutor = tutor.with_text_to_speech(Arc::new(TtsClient::new(key)));
        }
        None => info!("Spoken replies disabled (no google_tts_api_key)"),
    }

    let engine = Arc::new(TutorEngine::new(tutor));

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<BotCommand>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command(msg: Message, command: BotCommand, engine: Arc<TutorEngine>) -> ResponseResult<()> {
    info!("📨 /{:?} from {}", command, msg.chat.id);
    engine.handle_message(msg.chat.id.0, Incoming::Command(command.into())).await;
    Ok(())
}

async fn handle_message(msg: Message, engine: Arc<TutorEngine>) -> ResponseResult<()> {
    let user_id = msg.chat.id.0;

    if let Some(voice) = msg.voice() {
        info!("🎤 Voice message from {user_id}");
        let file_id = voice.file.id.0.clone();
        engine.handle_message(user_id, Incoming::Voice { file_id }).await;
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    // Unknown commands are ignored
    if text.starts_with('/') {
        return Ok(());
    }

    let text_preview: String = text.chars().take(100).collect();
    info!("📨 Message from {user_id}: \"{text_preview}\"");
    engine.handle_message(user_id, Incoming::Text(text.to_string())).await;
    Ok(())
}
