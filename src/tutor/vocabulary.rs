//! Fixed Spanish → Russian vocabulary shared by the quiz, the daily word and
//! the word-chain game.

/// An immutable word pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub source_word: &'static str,
    pub translation: &'static str,
}

const fn entry(source_word: &'static str, translation: &'static str) -> VocabularyEntry {
    VocabularyEntry { source_word, translation }
}

/// The built-in word list, in display order.
pub static VOCABULARY: &[VocabularyEntry] = &[
    entry("gato", "кошка"),
    entry("perro", "собака"),
    entry("casa", "дом"),
    entry("libro", "книга"),
    entry("mesa", "стол"),
    entry("silla", "стул"),
    entry("agua", "вода"),
    entry("comida", "еда"),
    entry("familia", "семья"),
    entry("escuela", "школа"),
    entry("amigo", "друг"),
    entry("ciudad", "город"),
    entry("cielo", "небо"),
    entry("sol", "солнце"),
    entry("luna", "луна"),
    entry("estrella", "звезда"),
    entry("flor", "цветок"),
    entry("árbol", "дерево"),
    entry("montaña", "гора"),
    entry("río", "река"),
    entry("mar", "море"),
    entry("tierra", "земля"),
    entry("camino", "дорога"),
    entry("auto", "машина"),
    entry("tren", "поезд"),
    entry("avión", "самолет"),
    entry("puerta", "дверь"),
    entry("ventana", "окно"),
    entry("rojo", "красный"),
    entry("azul", "синий"),
    entry("verde", "зелёный"),
    entry("amarillo", "жёлтый"),
    entry("blanco", "белый"),
    entry("negro", "чёрный"),
    entry("feliz", "счастливый"),
    entry("triste", "грустный"),
    entry("rápido", "быстрый"),
    entry("lento", "медленный"),
    entry("calor", "жара"),
    entry("frío", "холод"),
    entry("manzana", "яблоко"),
    entry("plátano", "банан"),
    entry("naranja", "апельсин"),
    entry("limón", "лимон"),
    entry("uva", "виноград"),
    entry("queso", "сыр"),
    entry("pan", "хлеб"),
    entry("pescado", "рыба"),
    entry("carne", "мясо"),
    entry("pollo", "курица"),
    entry("tenedor", "вилка"),
];

impl VocabularyEntry {
    /// Format as "word - translation".
    pub fn display(&self) -> String {
        format!("{} - {}", self.source_word, self.translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_words_are_unique() {
        let words: HashSet<_> = VOCABULARY.iter().map(|e| e.source_word).collect();
        assert_eq!(words.len(), VOCABULARY.len());
        let translations: HashSet<_> = VOCABULARY.iter().map(|e| e.translation).collect();
        assert_eq!(translations.len(), VOCABULARY.len());
    }

    #[test]
    fn test_words_are_lowercase() {
        for e in VOCABULARY {
            assert_eq!(e.source_word, e.source_word.to_lowercase());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(VOCABULARY[0].display(), "gato - кошка");
    }
}
