//! # Filtre léger — pré-classification rapide des messages
//!
//! Rejette ou annote un message en quelques millisecondes, avant tout
//! appel LLM. Trois sous-filtres évalués dans l'ordre:
//! 1. rate limit par utilisateur (fenêtre glissante)
//! 2. mots-clés: PII bloquant, indices toxiques/spam non bloquants
//! 3. liste de vulgarité
//!
//! Le filtre n'échoue jamais un message: toute erreur interne est loggée
//! et le message continue vers le LLM (fail-open).

pub mod keyword;
pub mod profanity;
pub mod rate_limit;
pub mod routes;

use crate::config::FilterSettings;
use crate::error::{ModerationError, Result};
use crate::models::{ChatMessage, FilterDecision, FilterType, FilterVerdict};
use keyword::KeywordFilter;
use parking_lot::RwLock;
use profanity::ProfanityFilter;
use rate_limit::RateLimitFilter;
use serde::Serialize;
use std::time::Instant;

/// État d'activation des sous-filtres, modifiable à chaud
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FilterToggles {
    pub keywords: bool,
    pub profanity: bool,
    pub rate_limit: bool,
}

impl Default for FilterToggles {
    fn default() -> Self {
        Self {
            keywords: true,
            profanity: true,
            rate_limit: true,
        }
    }
}

/// Statistiques exposées sur `/stats`
#[derive(Debug, Serialize)]
pub struct FilterStats {
    pub active_users: usize,
    pub total_banned_words: usize,
    pub total_profanity_words: usize,
    pub enabled_filters: FilterToggles,
}

/// Le filtre léger complet
pub struct LightweightFilter {
    keyword: KeywordFilter,
    profanity: ProfanityFilter,
    rate_limit: RateLimitFilter,
    toggles: RwLock<FilterToggles>,
    settings: FilterSettings,
}

impl LightweightFilter {
    /// Construit le filtre depuis les artefacts de configuration
    pub fn from_settings(settings: FilterSettings) -> Result<Self> {
        Ok(Self {
            keyword: KeywordFilter::load(&settings.config_path)?,
            profanity: ProfanityFilter::load(&settings.profanity_path),
            rate_limit: RateLimitFilter::new(
                settings.rate_limit_window,
                settings.max_messages_per_window,
            ),
            toggles: RwLock::new(FilterToggles::default()),
            settings,
        })
    }

    /// Variante de test avec les jeux de motifs embarqués
    pub fn with_defaults(settings: FilterSettings) -> Self {
        Self {
            keyword: KeywordFilter::with_defaults(),
            profanity: ProfanityFilter::with_defaults(),
            rate_limit: RateLimitFilter::new(
                settings.rate_limit_window,
                settings.max_messages_per_window,
            ),
            toggles: RwLock::new(FilterToggles::default()),
            settings,
        }
    }

    /// Applique tous les sous-filtres actifs. Ne bloque jamais sur le
    /// réseau et ne fait jamais échouer le message.
    pub fn process(&self, message: &ChatMessage) -> FilterVerdict {
        let started = Instant::now();

        match self.evaluate(message, started) {
            Ok(verdict) => verdict,
            Err(e) => {
                // Fail-open: le LLM reste le dernier arbitre
                tracing::error!(error = %e, user_id = %message.user_id, "❌ Erreur interne du filtre, fail-open");
                FilterVerdict {
                    should_process: true,
                    decision: FilterDecision::Pass,
                    confidence: 0.5,
                    matched_patterns: Vec::new(),
                    filter_type: FilterType::Combined,
                    processing_time_ms: elapsed_ms(started),
                }
            }
        }
    }

    fn evaluate(&self, message: &ChatMessage, started: Instant) -> Result<FilterVerdict> {
        let toggles = *self.toggles.read();

        // 1. Rate limit d'abord: verdict le moins cher
        if toggles.rate_limit && self.rate_limit.is_rate_limited(&message.user_id) {
            return Ok(FilterVerdict {
                should_process: false,
                decision: FilterDecision::RateLimited,
                confidence: 1.0,
                matched_patterns: vec!["rate_limit_exceeded".to_string()],
                filter_type: FilterType::RateLimit,
                processing_time_ms: elapsed_ms(started),
            });
        }

        // 2. Scan par mots-clés: le PII est bloquant, les indices
        // toxiques/spam sont transmis au LLM pour arbitrage final
        if toggles.keywords {
            let scan = self.keyword.scan(&message.message);

            if !scan.pii.is_empty() {
                return Ok(FilterVerdict {
                    should_process: false,
                    decision: FilterDecision::BlockPii,
                    confidence: 0.95,
                    matched_patterns: scan.pii,
                    filter_type: FilterType::Keyword,
                    processing_time_ms: elapsed_ms(started),
                });
            }

            if scan.has_toxic_hint() {
                let mut matched = scan.banned;
                matched.extend(scan.toxic);
                return Ok(FilterVerdict {
                    should_process: true,
                    decision: FilterDecision::LikelyToxic,
                    confidence: 0.8,
                    matched_patterns: matched,
                    filter_type: FilterType::Keyword,
                    processing_time_ms: elapsed_ms(started),
                });
            }

            if !scan.spam.is_empty() {
                return Ok(FilterVerdict {
                    should_process: true,
                    decision: FilterDecision::LikelySpam,
                    confidence: 0.7,
                    matched_patterns: scan.spam,
                    filter_type: FilterType::Keyword,
                    processing_time_ms: elapsed_ms(started),
                });
            }
        }

        // 3. Liste de vulgarité: signale sans bloquer
        if toggles.profanity {
            let matches = self.profanity.contains_profanity(&message.message);
            if !matches.is_empty() {
                return Ok(FilterVerdict {
                    should_process: true,
                    decision: FilterDecision::Flagged,
                    confidence: 0.7,
                    matched_patterns: matches,
                    filter_type: FilterType::Profanity,
                    processing_time_ms: elapsed_ms(started),
                });
            }
        }

        Ok(FilterVerdict {
            should_process: true,
            decision: FilterDecision::Pass,
            confidence: 0.6,
            matched_patterns: Vec::new(),
            filter_type: FilterType::Combined,
            processing_time_ms: elapsed_ms(started),
        })
    }

    /// Active ou désactive un sous-filtre par son nom
    pub fn toggle(&self, name: &str, enabled: bool) -> Result<()> {
        let mut toggles = self.toggles.write();
        match name {
            "keywords" => toggles.keywords = enabled,
            "profanity" => toggles.profanity = enabled,
            "rate_limit" => toggles.rate_limit = enabled,
            _ => {
                return Err(ModerationError::NotFound {
                    resource: "filtre".to_string(),
                    id: name.to_string(),
                })
            }
        }

        tracing::info!(filter = %name, enabled = enabled, "🔧 Sous-filtre basculé");
        Ok(())
    }

    pub fn toggles(&self) -> FilterToggles {
        *self.toggles.read()
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            active_users: self.rate_limit.active_users(),
            total_banned_words: self.keyword.banned_words_count(),
            total_profanity_words: self.profanity.word_count(),
            enabled_filters: self.toggles(),
        }
    }

    /// Purge périodique des buckets de rate limiting inactifs
    pub fn cleanup_rate_limit_buckets(&self) {
        self.rate_limit
            .cleanup_old_buckets(std::time::Duration::from_secs(300));
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn message_from(user_id: &str, text: &str) -> ChatMessage {
        ChatMessage {
            user_id: user_id.to_string(),
            username: "test_user".to_string(),
            channel_id: "general".to_string(),
            message: text.to_string(),
            timestamp: Utc::now(),
            message_type: Default::default(),
            metadata: None,
        }
    }

    fn test_filter() -> LightweightFilter {
        LightweightFilter::with_defaults(FilterSettings::default())
    }

    #[test]
    fn test_email_is_blocked_as_pii() {
        let filter = test_filter();
        let verdict = filter.process(&message_from("u1", "My email is jane@acme.io"));

        assert!(!verdict.should_process);
        assert_eq!(verdict.decision, FilterDecision::BlockPii);
        assert_eq!(verdict.confidence, 0.95);
        assert_eq!(verdict.filter_type, FilterType::Keyword);
    }

    #[test]
    fn test_banned_word_is_forwarded_as_likely_toxic() {
        let filter = test_filter();
        let verdict = filter.process(&message_from("u1", "You are an idiot"));

        assert!(verdict.should_process);
        assert_eq!(verdict.decision, FilterDecision::LikelyToxic);
        assert_eq!(verdict.confidence, 0.8);
    }

    #[test]
    fn test_spam_only_is_likely_spam() {
        let filter = test_filter();
        let verdict = filter.process(&message_from("u1", "CLICK HERE for deals tinyurl/x9"));

        assert!(verdict.should_process);
        assert_eq!(verdict.decision, FilterDecision::LikelySpam);
        assert_eq!(verdict.confidence, 0.7);
    }

    #[test]
    fn test_profanity_only_is_flagged() {
        let filter = test_filter();
        let verdict = filter.process(&message_from("u1", "what the hell"));

        assert!(verdict.should_process);
        assert_eq!(verdict.decision, FilterDecision::Flagged);
        assert_eq!(verdict.filter_type, FilterType::Profanity);
    }

    #[test]
    fn test_clean_message_passes() {
        let filter = test_filter();
        let verdict = filter.process(&message_from("u1", "Good morning chat!"));

        assert!(verdict.should_process);
        assert_eq!(verdict.decision, FilterDecision::Pass);
        assert_eq!(verdict.confidence, 0.6);
        assert!(verdict.matched_patterns.is_empty());
    }

    #[test]
    fn test_eleventh_message_is_rate_limited() {
        let filter = test_filter();
        for _ in 0..10 {
            let verdict = filter.process(&message_from("u_flood", "hello"));
            assert_ne!(verdict.decision, FilterDecision::RateLimited);
        }

        let verdict = filter.process(&message_from("u_flood", "hello"));
        assert!(!verdict.should_process);
        assert_eq!(verdict.decision, FilterDecision::RateLimited);
        assert_eq!(verdict.confidence, 1.0);
        assert_eq!(verdict.filter_type, FilterType::RateLimit);
        assert_eq!(verdict.matched_patterns, vec!["rate_limit_exceeded"]);
    }

    #[test]
    fn test_disabled_rate_limit_never_limits() {
        let filter = test_filter();
        filter.toggle("rate_limit", false).unwrap();
        for _ in 0..20 {
            let verdict = filter.process(&message_from("u_flood", "hello"));
            assert_ne!(verdict.decision, FilterDecision::RateLimited);
        }
    }

    #[test]
    fn test_disabled_keywords_skips_pii_block() {
        let filter = test_filter();
        filter.toggle("keywords", false).unwrap();
        let verdict = filter.process(&message_from("u1", "My email is jane@acme.io"));
        assert!(verdict.should_process);
    }

    #[test]
    fn test_unknown_toggle_is_not_found() {
        let filter = test_filter();
        assert!(filter.toggle("sentiment", true).is_err());
    }
}
