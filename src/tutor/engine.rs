//! Tutor engine - per-user message processing.
//!
//! Every user gets a single-consumer queue and a worker task, so messages
//! from one user are handled strictly in arrival order while different users
//! run concurrently. Each message is processed in its own task; a failure
//! is reported to that user only and the worker keeps going.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::tutor::cache::ResponseCache;
use crate::tutor::router::{Command, Keyboard, Reply, Route, SessionRouter};
use crate::tutor::services::{ChatTransport, LanguageModel, SpeechToText, TextToSpeech};
use crate::tutor::session::{Session, SessionStore};

/// Shown when the language model fails.
pub const APOLOGY: &str = "Извините, произошла ошибка при обработке вашего запроса.";
/// Shown when a voice note cannot be recognized.
pub const CANNOT_RECOGNIZE: &str = "Извините, не могу распознать аудиосообщение.";
/// Shown when a voice note cannot be fetched.
pub const VOICE_FAILED: &str = "Произошла ошибка обработки голосового сообщения.";
/// Shown when processing a message crashed.
pub const INTERNAL_ERROR: &str = "Извините, произошла ошибка. Пожалуйста, попробуйте снова позже.";

/// An incoming user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    Command(Command),
    Voice { file_id: String },
}

/// Language settings for the voice pipeline.
#[derive(Debug, Clone)]
pub struct VoiceSettings {
    pub stt_language: String,
    pub tts_language: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stt_language: "ru".to_string(),
            tts_language: "ru-RU".to_string(),
        }
    }
}

/// Everything needed to process one message.
pub struct Tutor {
    router: SessionRouter,
    sessions: SessionStore,
    cache: ResponseCache,
    llm: Arc<dyn LanguageModel>,
    stt: Option<Arc<dyn SpeechToText>>,
    tts: Option<Arc<dyn TextToSpeech>>,
    transport: Arc<dyn ChatTransport>,
    voice: VoiceSettings,
}

impl Tutor {
    pub fn new(
        router: SessionRouter,
        cache: ResponseCache,
        llm: Arc<dyn LanguageModel>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            router,
            sessions: SessionStore::new(),
            cache,
            llm,
            stt: None,
            tts: None,
            transport,
            voice: VoiceSettings::default(),
        }
    }

    pub fn with_speech_to_text(mut self, stt: Arc<dyn SpeechToText>) -> Self {
        self.stt = Some(stt);
        self
    }

    pub fn with_text_to_speech(mut self, tts: Arc<dyn TextToSpeech>) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn with_voice_settings(mut self, voice: VoiceSettings) -> Self {
        self.voice = voice;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Process one message to completion.
    pub async fn process(&self, user_id: i64, msg: Incoming) {
        match msg {
            Incoming::Text(text) => self.process_text(user_id, &text).await,
            Incoming::Command(command) => self.process_command(user_id, command).await,
            Incoming::Voice { file_id } => self.process_voice(user_id, &file_id).await,
        }
    }

    async fn process_text(&self, user_id: i64, text: &str) {
        info!("💬 {}: \"{}\"", user_id, text.chars().take(50).collect::<String>());
        self.typing(user_id).await;

        let route = {
            let session = self.sessions.get(user_id).await;
            let mut session = session.lock().await;
            route_text(&self.router, &mut session, text)
        };

        match route {
            Route::Reply(reply) => self.deliver(user_id, &reply.text, reply.keyboard).await,
            Route::FreeForm(question) => {
                let answer = self.answer(&question).await;
                self.deliver(user_id, &answer, Keyboard::None).await;
            }
        }
    }

    async fn process_command(&self, user_id: i64, command: Command) {
        info!("⌨️ {}: {:?}", user_id, command);
        self.typing(user_id).await;

        let reply = {
            let session = self.sessions.get(user_id).await;
            let mut session = session.lock().await;
            run_command(&self.router, &mut session, command)
        };
        self.deliver(user_id, &reply.text, reply.keyboard).await;
    }

    /// Voice notes skip the router: recognize, answer, speak.
    async fn process_voice(&self, user_id: i64, file_id: &str) {
        info!("🎤 Voice from {}", user_id);
        if let Err(e) = self.transport.send_recording_indicator(user_id).await {
            debug!("Recording indicator not sent: {e}");
        }

        let audio = match self.transport.download_voice(file_id).await {
            Ok(audio) => audio,
            Err(e) => {
                error!("Voice download failed: {e}");
                self.deliver(user_id, VOICE_FAILED, Keyboard::None).await;
                return;
            }
        };

        let Some(stt) = &self.stt else {
            warn!("Voice message received but speech recognition is not configured");
            self.deliver(user_id, CANNOT_RECOGNIZE, Keyboard::None).await;
            return;
        };

        let text = match stt.transcribe(audio, &self.voice.stt_language).await {
            Ok(text) => text,
            Err(e) => {
                error!("{e}");
                self.deliver(user_id, CANNOT_RECOGNIZE, Keyboard::None).await;
                return;
            }
        };
        info!("🎤 Recognized: \"{}\"", text.chars().take(50).collect::<String>());

        let answer = self.answer(&text).await;

        let Some(tts) = &self.tts else {
            self.deliver(user_id, &answer, Keyboard::None).await;
            return;
        };

        match tts.synthesize(&answer, &self.voice.tts_language).await {
            Ok(audio) => {
                if let Err(e) = self.transport.send_voice(user_id, audio).await {
                    warn!("Voice reply to {} not delivered: {e}", user_id);
                }
            }
            Err(e) => {
                warn!("{e}, replying with text");
                self.deliver(user_id, &answer, Keyboard::None).await;
            }
        }
    }

    /// Cache-backed language model answer. Failures become the apology.
    pub async fn answer(&self, question: &str) -> String {
        match self.cache.lookup_or_compute(question, || self.llm.ask(question)).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Answer failed: {e}");
                APOLOGY.to_string()
            }
        }
    }

    async fn typing(&self, user_id: i64) {
        if let Err(e) = self.transport.send_typing_indicator(user_id).await {
            debug!("Typing indicator not sent: {e}");
        }
    }

    async fn deliver(&self, user_id: i64, text: &str, keyboard: Keyboard) {
        if let Err(e) = self.transport.send_text(user_id, text, keyboard).await {
            warn!("Reply to {} not delivered: {e}", user_id);
        }
    }
}

fn route_text(router: &SessionRouter, session: &mut Session, text: &str) -> Route {
    router.handle_text(session, text, &mut rand::thread_rng())
}

fn run_command(router: &SessionRouter, session: &mut Session, command: Command) -> Reply {
    router.handle_command(session, command, &mut rand::thread_rng())
}

/// Fans messages out to per-user ordered workers.
pub struct TutorEngine {
    tutor: Arc<Tutor>,
    queues: Mutex<HashMap<i64, mpsc::UnboundedSender<Incoming>>>,
}

impl TutorEngine {
    pub fn new(tutor: Tutor) -> Self {
        Self {
            tutor: Arc::new(tutor),
            queues: Mutex::new(HashMap::new()),
        }
    }

    pub fn tutor(&self) -> &Arc<Tutor> {
        &self.tutor
    }

    /// Queue a message for its user's worker.
    pub async fn handle_message(&self, user_id: i64, msg: Incoming) {
        let mut queues = self.queues.lock().await;

        let msg = match queues.get(&user_id) {
            Some(tx) => match tx.send(msg) {
                Ok(()) => return,
                Err(mpsc::error::SendError(msg)) => {
                    warn!("Worker for {} is gone, restarting", user_id);
                    msg
                }
            },
            None => msg,
        };

        let tx = spawn_worker(self.tutor.clone(), user_id);
        if tx.send(msg).is_err() {
            error!("New worker for {} rejected message", user_id);
        }
        queues.insert(user_id, tx);
    }
}

fn spawn_worker(tutor: Arc<Tutor>, user_id: i64) -> mpsc::UnboundedSender<Incoming> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Incoming>();
    debug!("Starting worker for {}", user_id);

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let task = {
                let tutor = tutor.clone();
                tokio::spawn(async move { tutor.process(user_id, msg).await })
            };
            if let Err(e) = task.await {
                error!("Processing message from {} crashed: {e}", user_id);
                tutor.deliver(user_id, INTERNAL_ERROR, Keyboard::None).await;
            }
        }
    });

    tx
}
