//! Per-user dispatch: decides which handler consumes an incoming text.
//!
//! Priority is fixed: level selection, quiz answer, word-game move, menu
//! label, then free-form question. Routing is synchronous and never touches
//! the network; free-form questions are handed back to the caller.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::tutor::quiz::{self, QuizQuestion};
use crate::tutor::session::{Level, Mode, Session};
use crate::tutor::vocabulary::VocabularyEntry;
use crate::tutor::word_chain::{self, EndResult, GameState, Outcome};

pub const MENU_QUIZ: &str = "КВИЗ";
pub const MENU_DAILY_WORD: &str = "Учи по одному слову в день";
pub const MENU_WORD_GAME: &str = "Игра в слова";
pub const MENU_LEVEL: &str = "Твой уровень испанского";

/// Main menu layout, row by row.
pub const MAIN_MENU: [&[&str]; 2] = [&[MENU_QUIZ, MENU_DAILY_WORD, MENU_WORD_GAME], &[MENU_LEVEL]];

/// Level picker layout, row by row.
pub const LEVEL_MENU: [[Level; 3]; 2] = [
    [Level::A1, Level::A2, Level::B1],
    [Level::B2, Level::C1, Level::C2],
];

const GREETING: &str = "¡Hola! Я твой бот для изучения испанского. Задавай вопросы на испанском или английском, и я помогу!\n\
Используйте меню ниже для взаимодействия со мной.";

const HELP: &str = "Я бот для изучения испанского языка! Вот что я умею:\n\
- Напишите сообщение на испанском или английском, и я помогу с переводом или объяснением.\n\
- Используйте команду /quiz для викторины.\n\
- Используйте команду /daily для получения нового слова на каждый день.\n\
- Используйте команду /wordgame для игры в слова.\n\
- Используйте команду /setlevel для установки вашего уровня изучения.\n\
- Отправьте голосовое сообщение, и я попробую его распознать.\n";

/// Reply keyboard to attach to an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// Persistent main menu.
    Main,
    /// One-time level picker.
    Levels,
    /// Leave the current keyboard as is.
    None,
}

/// A finished reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Reply {
    fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self { text: text.into(), keyboard }
    }
}

/// What to do with an incoming text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Reply(Reply),
    /// Ask the language model this question.
    FreeForm(String),
}

/// Slash commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    EndGame,
    Quiz,
    Daily,
    WordGame,
    SetLevel,
}

/// Routes text and commands against a session.
pub struct SessionRouter {
    vocabulary: &'static [VocabularyEntry],
}

impl SessionRouter {
    pub fn new(vocabulary: &'static [VocabularyEntry]) -> Self {
        Self { vocabulary }
    }

    /// Route one text message. The session is updated in place.
    pub fn handle_text<R: Rng + ?Sized>(&self, session: &mut Session, text: &str, rng: &mut R) -> Route {
        let text = text.trim();

        let route = match &session.mode {
            Mode::SelectingLevel => Route::Reply(self.select_level(session, text)),
            Mode::AwaitingQuiz { expected } => {
                let expected = *expected;
                Route::Reply(self.answer_quiz(session, expected, text))
            }
            Mode::InWordGame { last_word } => {
                let last_word = last_word.clone();
                Route::Reply(self.play_word(session, &last_word, text, rng))
            }
            Mode::Idle => match text {
                MENU_QUIZ => Route::Reply(self.start_quiz(session, rng)),
                MENU_DAILY_WORD => Route::Reply(self.daily_word(rng)),
                MENU_WORD_GAME => Route::Reply(self.start_word_game(session, rng)),
                MENU_LEVEL => Route::Reply(self.show_level_selection(session)),
                _ => Route::FreeForm(text.to_string()),
            },
        };

        debug!("Session after routing: {:?}", session.snapshot());
        route
    }

    /// Run a slash command.
    ///
    /// Level selection is only left by sending a valid level code, so while
    /// it is active the feature commands re-prompt instead of switching mode.
    pub fn handle_command<R: Rng + ?Sized>(&self, session: &mut Session, command: Command, rng: &mut R) -> Reply {
        let selecting = session.mode == Mode::SelectingLevel;
        let reply = match command {
            Command::Quiz | Command::Daily | Command::WordGame | Command::SetLevel if selecting => {
                Reply::new(LEVEL_REPROMPT, Keyboard::Levels)
            }
            Command::Start => Reply::new(GREETING, Keyboard::Main),
            Command::Help => Reply::new(HELP, Keyboard::None),
            Command::EndGame => self.end_game(session),
            Command::Quiz => self.start_quiz(session, rng),
            Command::Daily => self.daily_word(rng),
            Command::WordGame => self.start_word_game(session, rng),
            Command::SetLevel => self.show_level_selection(session),
        };
        debug!("Session after {:?}: {:?}", command, session.snapshot());
        reply
    }

    fn show_level_selection(&self, session: &mut Session) -> Reply {
        session.mode = Mode::SelectingLevel;
        Reply::new("Выберите ваш уровень изучения испанского:", Keyboard::Levels)
    }

    fn select_level(&self, session: &mut Session, text: &str) -> Reply {
        match text.parse::<Level>() {
            Ok(level) => {
                info!("🎓 Level set to {level}");
                session.level = Some(level);
                session.mode = Mode::Idle;
                Reply::new(format!("Ваш уровень изучения установлен на {level}."), Keyboard::Main)
            }
            // No way out until a valid code arrives
            Err(_) => Reply::new(LEVEL_REPROMPT, Keyboard::Levels),
        }
    }

    fn start_quiz<R: Rng + ?Sized>(&self, session: &mut Session, rng: &mut R) -> Reply {
        let question = QuizQuestion::generate(self.vocabulary, rng);
        info!("❓ Quiz on '{}' (answer {})", question.word, question.correct);
        session.mode = Mode::AwaitingQuiz { expected: question.correct };
        Reply::new(question.render(), Keyboard::None)
    }

    fn answer_quiz(&self, session: &mut Session, expected: char, text: &str) -> Reply {
        if !quiz::is_option_label(text, quiz::OPTION_COUNT) {
            return Reply::new("Пожалуйста, ответьте буквой варианта: A, B, C или D.", Keyboard::None);
        }

        session.mode = Mode::Idle;
        if quiz::check_answer(expected, text) {
            Reply::new("Правильно! Молодец!", Keyboard::None)
        } else {
            Reply::new(format!("Неправильно. Правильный ответ был: {expected}"), Keyboard::None)
        }
    }

    fn daily_word<R: Rng + ?Sized>(&self, rng: &mut R) -> Reply {
        let text = match self.vocabulary.choose(rng) {
            Some(entry) => format!("Ваше сегодняшнее слово: {}", entry.display()),
            None => "Слов пока нет.".to_string(),
        };
        Reply::new(text, Keyboard::None)
    }

    fn start_word_game<R: Rng + ?Sized>(&self, session: &mut Session, rng: &mut R) -> Reply {
        let (word, _) = word_chain::start(self.vocabulary, rng);
        session.mode = Mode::InWordGame { last_word: word.to_string() };
        Reply::new(
            format!(
                "Начнем игру! Ваше слово: {word}. Напишите слово, которое начинается на букву '{}'.",
                letter(word)
            ),
            Keyboard::Main,
        )
    }

    fn play_word<R: Rng + ?Sized>(&self, session: &mut Session, last_word: &str, text: &str, rng: &mut R) -> Reply {
        let player_word = word_chain::normalize(text);

        match word_chain::submit_move(last_word, &player_word, self.vocabulary, rng) {
            Outcome::Invalid { .. } => Reply::new(
                format!(
                    "Ваше слово должно начинаться на букву '{}'. Попробуйте еще раз.",
                    letter(last_word)
                ),
                Keyboard::Main,
            ),
            Outcome::BotWins { bot_word } => {
                session.mode = Mode::InWordGame { last_word: bot_word.to_string() };
                Reply::new(
                    format!(
                        "Ваше слово: {player_word}. Моё слово: {bot_word}. Ваш ход — на букву '{}'.",
                        letter(bot_word)
                    ),
                    Keyboard::Main,
                )
            }
            Outcome::PlayerWins => {
                info!("🏆 Player won the word game with '{player_word}'");
                session.mode = Mode::Idle;
                Reply::new(
                    format!(
                        "Ваше слово: {player_word}, но я не знаю больше слов на букву '{}'. Вы выиграли!",
                        letter(&player_word)
                    ),
                    Keyboard::Main,
                )
            }
        }
    }

    fn end_game(&self, session: &mut Session) -> Reply {
        let state = match session.mode {
            Mode::InWordGame { .. } => GameState::AwaitingPlayerMove,
            _ => GameState::NotStarted,
        };
        match word_chain::end(state) {
            (EndResult::Ended, _) => {
                session.mode = Mode::Idle;
                Reply::new("Игра завершена. Надеюсь, вам понравилось!", Keyboard::Main)
            }
            (EndResult::NotInGame, _) => Reply::new("Вы сейчас не в игре.", Keyboard::Main),
        }
    }
}

const LEVEL_REPROMPT: &str = "Пожалуйста, выберите уровень, используя кнопки ниже:";

fn letter(word: &str) -> char {
    word_chain::last_letter(word).unwrap_or('?')
}
