//! Filtre par mots-clés et motifs: mots bannis, toxicité, spam, PII
//!
//! La configuration est chargée une fois au démarrage depuis un fichier
//! TOML; en son absence, un jeu de motifs par défaut est compilé.

use crate::error::{ModerationError, Result};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Extraction de mots entiers, sur le message minuscule
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("regex de mots valide"));

/// Fichier de configuration du filtre par mots-clés
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordConfigFile {
    #[serde(default)]
    pub banned_words: Vec<String>,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub patterns: PatternSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternSection {
    #[serde(default)]
    pub toxic: Vec<String>,
    #[serde(default)]
    pub spam: Vec<String>,
    #[serde(default)]
    pub pii: Vec<String>,
}

/// Résultat brut du scan d'un message
#[derive(Debug, Clone, Default)]
pub struct KeywordScan {
    pub banned: Vec<String>,
    pub toxic: Vec<String>,
    pub spam: Vec<String>,
    pub pii: Vec<String>,
}

impl KeywordScan {
    /// true si un indice toxique (motif ou mot banni) a été trouvé
    pub fn has_toxic_hint(&self) -> bool {
        !self.toxic.is_empty() || !self.banned.is_empty()
    }
}

/// Filtre par mots-clés avec listes bannies/whitelist et motifs compilés
#[derive(Debug)]
pub struct KeywordFilter {
    banned_words: HashSet<String>,
    whitelist: HashSet<String>,
    toxic_patterns: Vec<Regex>,
    spam_patterns: Vec<Regex>,
    pii_patterns: Vec<Regex>,
}

impl KeywordFilter {
    /// Charge la configuration; bascule sur les valeurs par défaut si le
    /// fichier est absent
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let config: KeywordConfigFile = toml::from_str(&raw).map_err(|e| {
                    ModerationError::configuration_error(format!(
                        "Config de filtre illisible ({}): {}",
                        path.display(),
                        e
                    ))
                })?;
                let filter = Self::from_config(config)?;
                tracing::info!(
                    path = %path.display(),
                    banned_words = filter.banned_words.len(),
                    "✅ Configuration du filtre chargée"
                );
                Ok(filter)
            }
            Err(_) => {
                tracing::warn!(path = %path.display(), "⚠️ Config de filtre introuvable, valeurs par défaut");
                Ok(Self::with_defaults())
            }
        }
    }

    /// Construit le filtre depuis une configuration déjà parsée
    pub fn from_config(config: KeywordConfigFile) -> Result<Self> {
        Ok(Self {
            banned_words: config.banned_words.iter().map(|w| w.to_lowercase()).collect(),
            whitelist: config.whitelist.iter().map(|w| w.to_lowercase()).collect(),
            toxic_patterns: compile_patterns(&config.patterns.toxic)?,
            spam_patterns: compile_patterns(&config.patterns.spam)?,
            pii_patterns: compile_patterns(&config.patterns.pii)?,
        })
    }

    /// Jeu de motifs par défaut
    pub fn with_defaults() -> Self {
        let banned_words = [
            "spam", "scam", "fake", "bot", "hack", "cheat", "idiot", "stupid", "moron", "loser",
            "noob",
        ]
        .iter()
        .map(|w| w.to_string())
        .collect();

        let toxic_patterns = compile_patterns(&[
            r"\b(kill\s+yourself|kys)\b".to_string(),
            r"\b(go\s+die|die\s+in\s+a\s+fire)\b".to_string(),
            r"\b(hate\s+you|you\s+suck)\b".to_string(),
        ])
        .expect("motifs toxiques par défaut valides");

        let spam_patterns = compile_patterns(&[
            r"(bit\.ly|tinyurl|t\.co)/\w+".to_string(),
            r"(free\s+money|click\s+here|buy\s+now)".to_string(),
            r"💰{2,}|🎉{2,}|‼{2,}".to_string(),
        ])
        .expect("motifs spam par défaut valides");

        // Emails, téléphones, cartes de paiement, identifiants gouvernementaux
        let pii_patterns = compile_patterns(&[
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b".to_string(),
            r"\b\d{3}-\d{3}-\d{4}\b".to_string(),
            r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b".to_string(),
            r"\b\d{3}-\d{2}-\d{4}\b".to_string(),
        ])
        .expect("motifs PII par défaut valides");

        Self {
            banned_words,
            whitelist: HashSet::new(),
            toxic_patterns,
            spam_patterns,
            pii_patterns,
        }
    }

    /// Scanne un message contre toutes les listes et motifs
    pub fn scan(&self, message: &str) -> KeywordScan {
        KeywordScan {
            banned: self.check_banned_words(message),
            toxic: check_patterns(message, &self.toxic_patterns),
            spam: check_patterns(message, &self.spam_patterns),
            pii: check_patterns(message, &self.pii_patterns),
        }
    }

    /// Mots bannis présents dans le message (hors whitelist)
    fn check_banned_words(&self, message: &str) -> Vec<String> {
        let lowered = message.to_lowercase();
        WORD_RE
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .filter(|word| self.banned_words.contains(word) && !self.whitelist.contains(word))
            .collect()
    }

    pub fn banned_words_count(&self) -> usize {
        self.banned_words.len()
    }
}

/// Compile une liste de motifs, insensibles à la casse
fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    ModerationError::configuration_error(format!(
                        "Motif invalide '{}': {}",
                        pattern, e
                    ))
                })
        })
        .collect()
}

/// Texte des correspondances d'une liste de motifs
fn check_patterns(message: &str, patterns: &[Regex]) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|pattern| pattern.find_iter(message))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_email_is_pii() {
        let filter = KeywordFilter::with_defaults();
        let scan = filter.scan("My email is jane@acme.io");
        assert_eq!(scan.pii, vec!["jane@acme.io"]);
    }

    #[test]
    fn test_phone_and_government_id_are_pii() {
        let filter = KeywordFilter::with_defaults();
        assert!(!filter.scan("Call me at 555-123-4567").pii.is_empty());
        assert!(!filter.scan("My SSN is 123-45-6789").pii.is_empty());
    }

    #[test]
    fn test_payment_card_with_separators_is_pii() {
        let filter = KeywordFilter::with_defaults();
        assert!(!filter.scan("card 4532-1234-5678-9012").pii.is_empty());
        assert!(!filter.scan("card 4532 1234 5678 9012").pii.is_empty());
        assert!(!filter.scan("card 4532123456789012").pii.is_empty());
    }

    #[test]
    fn test_banned_word_detection_is_case_insensitive() {
        let filter = KeywordFilter::with_defaults();
        let scan = filter.scan("You are an IDIOT");
        assert_eq!(scan.banned, vec!["idiot"]);
        assert!(scan.has_toxic_hint());
    }

    #[test]
    fn test_whitelist_overrides_banned_word() {
        let config = KeywordConfigFile {
            banned_words: vec!["bot".to_string()],
            whitelist: vec!["bot".to_string()],
            patterns: PatternSection::default(),
        };
        let filter = KeywordFilter::from_config(config).unwrap();
        assert!(filter.scan("nice bot").banned.is_empty());
    }

    #[test]
    fn test_toxic_pattern_matches_phrases() {
        let filter = KeywordFilter::with_defaults();
        assert!(!filter.scan("go die in a fire").toxic.is_empty());
        assert!(filter.scan("have a nice day").toxic.is_empty());
    }

    #[test]
    fn test_spam_shortener_links() {
        let filter = KeywordFilter::with_defaults();
        let scan = filter.scan("FREE MONEY HERE: bit.ly/fake-link");
        assert!(!scan.spam.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_a_config_error() {
        let config = KeywordConfigFile {
            banned_words: vec![],
            whitelist: vec![],
            patterns: PatternSection {
                toxic: vec!["((".to_string()],
                spam: vec![],
                pii: vec![],
            },
        };
        assert!(KeywordFilter::from_config(config).is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "banned_words = [\"troll\"]\nwhitelist = []\n[patterns]\ntoxic = ['\\btest_toxic\\b']\nspam = []\npii = []"
        )
        .unwrap();

        let filter = KeywordFilter::load(file.path()).unwrap();
        assert_eq!(filter.banned_words_count(), 1);
        assert!(!filter.scan("what a troll").banned.is_empty());
        assert!(!filter.scan("test_toxic here").toxic.is_empty());
    }
}
