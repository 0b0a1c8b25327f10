//! Spanish tutor - routes chat messages to the quiz, the word game, the
//! level picker or the language model.

pub mod cache;
pub mod engine;
pub mod llm;
pub mod quiz;
pub mod router;
pub mod services;
pub mod session;
pub mod telegram;
pub mod tts;
pub mod vocabulary;
pub mod whisper;
pub mod word_chain;


pub use cache::ResponseCache;
pub use engine::{Incoming, Tutor, TutorEngine, VoiceSettings};
pub use router::{Command, SessionRouter};
pub use telegram::TelegramClient;
pub use vocabulary::VOCABULARY;
pub use whisper::Whisper;
