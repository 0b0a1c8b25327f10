//! Multiple-choice translation quiz.

use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index::sample;

use crate::tutor::vocabulary::VocabularyEntry;

/// Number of options per question.
pub const OPTION_COUNT: usize = 4;

/// One quiz question, alive until the user answers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub word: &'static str,
    /// Candidate translations in display order.
    pub options: Vec<&'static str>,
    /// Label of the correct option (`'A'`..).
    pub correct: char,
}

/// Label for the option at `index` (0 → `'A'`).
fn label(index: usize) -> char {
    (b'A' + index as u8) as char
}

impl QuizQuestion {
    /// Build a question from `vocabulary`.
    ///
    /// One entry is the target; three distractors are sampled without
    /// replacement from the remaining entries. The vocabulary must hold at
    /// least four entries.
    pub fn generate<R: Rng + ?Sized>(vocabulary: &[VocabularyEntry], rng: &mut R) -> Self {
        debug_assert!(vocabulary.len() >= OPTION_COUNT, "quiz needs at least {OPTION_COUNT} entries");

        let target = rng.gen_range(0..vocabulary.len());
        let others: Vec<&VocabularyEntry> = vocabulary
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target)
            .map(|(_, e)| e)
            .collect();

        let correct_translation = vocabulary[target].translation;
        let mut options = vec![correct_translation];
        options.extend(
            sample(rng, others.len(), OPTION_COUNT - 1)
                .into_iter()
                .map(|i| others[i].translation),
        );
        options.shuffle(rng);

        let correct_index = options
            .iter()
            .position(|o| *o == correct_translation)
            .unwrap_or(0);

        Self {
            word: vocabulary[target].source_word,
            options,
            correct: label(correct_index),
        }
    }

    /// Labels offered to the user, in order.
    pub fn labels(&self) -> impl Iterator<Item = char> + '_ {
        (0..self.options.len()).map(label)
    }

    /// Render the question for the chat.
    pub fn render(&self) -> String {
        let options = self
            .options
            .iter()
            .enumerate()
            .map(|(i, opt)| format!("{}) {}", label(i), opt))
            .collect::<Vec<_>>()
            .join("\n");
        format!("Как переводится слово '{}' на русский?\n\n{}", self.word, options)
    }
}

/// First character of the trimmed, uppercased answer.
pub fn answer_letter(given: &str) -> Option<char> {
    given.trim().to_uppercase().chars().next()
}

/// Compare a user's answer with the expected label, ignoring case.
pub fn check_answer(expected: char, given: &str) -> bool {
    answer_letter(given) == Some(expected.to_ascii_uppercase())
}

/// Whether `given` names one of the labels of a question with `option_count`
/// options.
pub fn is_option_label(given: &str, option_count: usize) -> bool {
    answer_letter(given).is_some_and(|c| (0..option_count).any(|i| label(i) == c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::vocabulary::VOCABULARY;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_generate_has_four_distinct_options_one_correct() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let q = QuizQuestion::generate(VOCABULARY, &mut rng);
            assert_eq!(q.options.len(), OPTION_COUNT);

            let distinct: HashSet<_> = q.options.iter().collect();
            assert_eq!(distinct.len(), OPTION_COUNT);

            let target = VOCABULARY.iter().find(|e| e.source_word == q.word).unwrap();
            let correct: Vec<_> = q.options.iter().filter(|o| **o == target.translation).collect();
            assert_eq!(correct.len(), 1);

            let idx = (q.correct as u8 - b'A') as usize;
            assert_eq!(q.options[idx], target.translation);
        }
    }

    #[test]
    fn test_generate_with_minimal_vocabulary() {
        let mut rng = StdRng::seed_from_u64(1);
        let q = QuizQuestion::generate(&VOCABULARY[..4], &mut rng);
        let all: HashSet<_> = VOCABULARY[..4].iter().map(|e| e.translation).collect();
        let got: HashSet<_> = q.options.iter().copied().collect();
        assert_eq!(all, got);
    }

    #[test]
    fn test_render() {
        let q = QuizQuestion {
            word: "gato",
            options: vec!["дом", "кошка", "стол", "небо"],
            correct: 'B',
        };
        assert_eq!(
            q.render(),
            "Как переводится слово 'gato' на русский?\n\nA) дом\nB) кошка\nC) стол\nD) небо"
        );
        assert_eq!(q.labels().collect::<String>(), "ABCD");
    }

    #[test]
    fn test_check_answer_case_insensitive() {
        assert!(check_answer('B', "B"));
        assert!(check_answer('B', "b"));
        assert!(check_answer('B', "  b  "));
        assert!(check_answer('B', "b) кошка"));
        assert!(!check_answer('B', "A"));
        assert!(!check_answer('B', ""));
        assert!(!check_answer('B', "   "));
    }

    #[test]
    fn test_is_option_label() {
        assert!(is_option_label("a", 4));
        assert!(is_option_label("D", 4));
        assert!(!is_option_label("E", 4));
        assert!(!is_option_label("кошка", 4));
        assert!(!is_option_label("", 4));
    }
}
