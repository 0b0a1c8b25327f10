//! Telegram client using teloxide.

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, FileId, InputFile, KeyboardButton, KeyboardMarkup, ReplyMarkup};
use tracing::{info, warn};

use crate::tutor::router::{Keyboard, LEVEL_MENU, MAIN_MENU};
use crate::tutor::services::{ChatTransport, TransportError};

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Persistent main menu.
pub fn main_menu_markup() -> KeyboardMarkup {
    let rows = MAIN_MENU
        .iter()
        .map(|row| row.iter().map(|label| KeyboardButton::new(*label)).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows).resize_keyboard()
}

/// One-time level picker.
pub fn level_menu_markup() -> KeyboardMarkup {
    let rows = LEVEL_MENU
        .iter()
        .map(|row| row.iter().map(|level| KeyboardButton::new(level.as_str())).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows).resize_keyboard().one_time_keyboard()
}

fn markup(keyboard: Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::Main => Some(ReplyMarkup::Keyboard(main_menu_markup())),
        Keyboard::Levels => Some(ReplyMarkup::Keyboard(level_menu_markup())),
        Keyboard::None => None,
    }
}

fn failed(what: &str, e: impl std::fmt::Display) -> TransportError {
    let msg = format!("Failed to {what}: {e}");
    warn!("{}", msg);
    TransportError(msg)
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(&self, user_id: i64, text: &str, keyboard: Keyboard) -> Result<(), TransportError> {
        let mut request = self.bot.send_message(ChatId(user_id), text);
        if let Some(markup) = markup(keyboard) {
            request = request.reply_markup(markup);
        }
        request.await.map(|_| ()).map_err(|e| failed("send message", e))
    }

    async fn send_voice(&self, user_id: i64, audio: Vec<u8>) -> Result<(), TransportError> {
        info!("🔊 Sending voice to {} ({} bytes)", user_id, audio.len());
        let input_file = InputFile::memory(audio).file_name("voice.ogg");
        self.bot
            .send_voice(ChatId(user_id), input_file)
            .await
            .map(|_| ())
            .map_err(|e| failed("send voice", e))
    }

    async fn send_typing_indicator(&self, user_id: i64) -> Result<(), TransportError> {
        self.bot
            .send_chat_action(ChatId(user_id), ChatAction::Typing)
            .await
            .map(|_| ())
            .map_err(|e| failed("send typing action", e))
    }

    async fn send_recording_indicator(&self, user_id: i64) -> Result<(), TransportError> {
        self.bot
            .send_chat_action(ChatId(user_id), ChatAction::RecordVoice)
            .await
            .map(|_| ())
            .map_err(|e| failed("send record_voice action", e))
    }

    async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| failed("get file info", e))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| failed("download file", e))?;

        info!("📥 Downloaded voice ({} bytes)", data.len());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(markup: &KeyboardMarkup) -> Vec<Vec<String>> {
        markup
            .keyboard
            .iter()
            .map(|row| row.iter().map(|b| b.text.clone()).collect())
            .collect()
    }

    #[test]
    fn test_main_menu_layout() {
        let markup = main_menu_markup();
        assert_eq!(
            labels(&markup),
            vec![
                vec!["КВИЗ", "Учи по одному слову в день", "Игра в слова"],
                vec!["Твой уровень испанского"],
            ]
        );
        assert!(!markup.one_time_keyboard);
    }

    #[test]
    fn test_level_menu_layout() {
        let markup = level_menu_markup();
        assert_eq!(labels(&markup), vec![vec!["A1", "A2", "B1"], vec!["B2", "C1", "C2"]]);
        assert!(markup.one_time_keyboard);
    }

    #[test]
    fn test_no_markup_for_none() {
        assert!(markup(Keyboard::None).is_none());
        assert!(markup(Keyboard::Levels).is_some());
    }
}
