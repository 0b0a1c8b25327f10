//! Word-chain game: each word must start with the last letter of the
//! previous one.
//!
//! Letters are compared as lowercased `char`s, so accented vowels are never
//! split into bytes.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::tutor::vocabulary::VocabularyEntry;

/// Game lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    NotStarted,
    AwaitingPlayerMove,
    Ended,
}

/// Why a move was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    WrongStartingLetter,
}

/// Result of one player move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Move rejected; the game keeps waiting with the same last word.
    Invalid { reason: InvalidReason },
    /// Move accepted and the bot answered; `bot_word` is the new last word.
    BotWins { bot_word: &'static str },
    /// Move accepted and the bot has no word to answer with. Game over.
    PlayerWins,
}

impl Outcome {
    /// State of the game after this outcome.
    pub fn next_state(&self) -> GameState {
        match self {
            Outcome::Invalid { .. } | Outcome::BotWins { .. } => GameState::AwaitingPlayerMove,
            Outcome::PlayerWins => GameState::Ended,
        }
    }
}

/// Result of an explicit end request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndResult {
    Ended,
    NotInGame,
}

fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Last letter of a word, lowercased.
pub fn last_letter(word: &str) -> Option<char> {
    word.chars().next_back().map(lower)
}

/// First letter of a word, lowercased.
pub fn first_letter(word: &str) -> Option<char> {
    word.chars().next().map(lower)
}

/// Normalize a player's input before play.
pub fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Pick the bot's opening word.
pub fn start<R: Rng + ?Sized>(vocabulary: &[VocabularyEntry], rng: &mut R) -> (&'static str, GameState) {
    let word = vocabulary.choose(rng).map(|e| e.source_word).unwrap_or("gato");
    (word, GameState::AwaitingPlayerMove)
}

/// Play `player_word` against `last_word`.
pub fn submit_move<R: Rng + ?Sized>(
    last_word: &str,
    player_word: &str,
    vocabulary: &[VocabularyEntry],
    rng: &mut R,
) -> Outcome {
    let player_word = normalize(player_word);

    let chained = match (last_letter(last_word), first_letter(&player_word)) {
        (Some(expected), Some(got)) => expected == got,
        _ => false,
    };
    if !chained {
        return Outcome::Invalid { reason: InvalidReason::WrongStartingLetter };
    }

    let Some(needed) = last_letter(&player_word) else {
        return Outcome::Invalid { reason: InvalidReason::WrongStartingLetter };
    };

    let candidates: Vec<&'static str> = vocabulary
        .iter()
        .map(|e| e.source_word)
        .filter(|w| first_letter(w) == Some(needed))
        .collect();

    match candidates.choose(rng) {
        Some(&bot_word) => Outcome::BotWins { bot_word },
        None => Outcome::PlayerWins,
    }
}

/// Explicitly end the game.
pub fn end(state: GameState) -> (EndResult, GameState) {
    match state {
        GameState::AwaitingPlayerMove => (EndResult::Ended, GameState::Ended),
        other => (EndResult::NotInGame, other),
    }
}
