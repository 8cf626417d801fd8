//! Filtre de vulgarité basé sur une liste plate de mots
//!
//! La liste est chargée depuis un fichier texte (un mot par ligne); une
//! courte liste embarquée sert de repli si le fichier est absent.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("regex de mots valide"));

/// Liste de vulgarité avec correspondance mot entier, insensible à la casse
#[derive(Debug)]
pub struct ProfanityFilter {
    words: HashSet<String>,
}

impl ProfanityFilter {
    /// Charge la liste depuis un fichier texte plat
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let words: HashSet<String> = raw
                    .lines()
                    .map(|line| line.trim().to_lowercase())
                    .filter(|line| !line.is_empty())
                    .collect();
                tracing::info!(
                    path = %path.display(),
                    count = words.len(),
                    "✅ Liste de vulgarité chargée"
                );
                Self { words }
            }
            Err(_) => {
                tracing::warn!(path = %path.display(), "⚠️ Liste de vulgarité introuvable, valeurs par défaut");
                Self::with_defaults()
            }
        }
    }

    pub fn with_defaults() -> Self {
        Self {
            words: ["damn", "hell", "crap", "stupid", "idiot"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }

    /// Mots de la liste présents dans le message
    pub fn contains_profanity(&self, message: &str) -> Vec<String> {
        let lowered = message.to_lowercase();
        WORD_RE
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .filter(|word| self.words.contains(word))
            .collect()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_default_words() {
        let filter = ProfanityFilter::with_defaults();
        assert_eq!(filter.contains_profanity("what the HELL"), vec!["hell"]);
        assert!(filter.contains_profanity("bonjour tout le monde").is_empty());
    }

    #[test]
    fn test_whole_word_match_only() {
        let filter = ProfanityFilter::with_defaults();
        // "hello" contient "hell" mais n'est pas un mot de la liste
        assert!(filter.contains_profanity("hello there").is_empty());
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "zut\nflute\n").unwrap();

        let filter = ProfanityFilter::load(file.path());
        assert_eq!(filter.word_count(), 2);
        assert_eq!(filter.contains_profanity("zut alors"), vec!["zut"]);
    }
}
