//! Per-user session state and the store that owns it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Spanish proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl Level {
    pub const ALL: [Level; 6] = [Level::A1, Level::A2, Level::B1, Level::B2, Level::C1, Level::C2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::A1 => "A1",
            Level::A2 => "A2",
            Level::B1 => "B1",
            Level::B2 => "B2",
            Level::C1 => "C1",
            Level::C2 => "C2",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    /// Parse a level code, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Level::ALL
            .into_iter()
            .find(|l| l.as_str() == code)
            .ok_or_else(|| format!("unknown level '{}'", s.trim()))
    }
}

/// The active interaction mode. Only one can be active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    SelectingLevel,
    AwaitingQuiz { expected: char },
    InWordGame { last_word: String },
}

/// State kept for one user for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub level: Option<Level>,
    pub mode: Mode,
}

/// Flat view of a session, one field per logical flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub awaiting_level_selection: bool,
    pub level: Option<Level>,
    pub awaiting_quiz_response: bool,
    pub quiz_expected_answer: Option<char>,
    pub in_word_game: bool,
    pub last_word: Option<String>,
}

impl SessionSnapshot {
    /// Number of mode flags set.
    pub fn active_modes(&self) -> usize {
        [self.awaiting_level_selection, self.awaiting_quiz_response, self.in_word_game]
            .into_iter()
            .filter(|f| *f)
            .count()
    }
}

impl Session {
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snap = SessionSnapshot {
            level: self.level,
            ..Default::default()
        };
        match &self.mode {
            Mode::Idle => {}
            Mode::SelectingLevel => snap.awaiting_level_selection = true,
            Mode::AwaitingQuiz { expected } => {
                snap.awaiting_quiz_response = true;
                snap.quiz_expected_answer = Some(*expected);
            }
            Mode::InWordGame { last_word } => {
                snap.in_word_game = true;
                snap.last_word = Some(last_word.clone());
            }
        }
        snap
    }
}

impl From<SessionSnapshot> for Session {
    /// Rebuild a session from flags. When several flags are set the mode is
    /// picked in dispatch priority: level selection, quiz, word game.
    fn from(snap: SessionSnapshot) -> Self {
        let mode = if snap.awaiting_level_selection {
            Mode::SelectingLevel
        } else if snap.awaiting_quiz_response {
            match snap.quiz_expected_answer {
                Some(expected) => Mode::AwaitingQuiz { expected },
                None => Mode::Idle,
            }
        } else if snap.in_word_game {
            match snap.last_word {
                Some(last_word) => Mode::InWordGame { last_word },
                None => Mode::Idle,
            }
        } else {
            Mode::Idle
        };
        Self { level: snap.level, mode }
    }
}

/// All sessions, keyed by user id.
///
/// The outer lock is only held to look up or create an entry. Each session
/// has its own lock so users never wait on each other.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session for `user_id`, creating it on first use.
    pub async fn get(&self, user_id: i64) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        sessions.entry(user_id).or_default().clone()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
