//! Parsing des réponses LLM: cascade du strict vers l'heuristique
//!
//! Le backend émet parfois du texte narratif autour du JSON demandé. La
//! cascade est un comportement requis, pas une optimisation:
//! 1. JSON strict
//! 2. JSON extrait (bloc ```json, bloc ```, objet accolé contenant "decision")
//! 3. Heuristique par mots-clés sur le texte brut
//!
//! Chaque étage est testable indépendamment.

use crate::models::ModerationOutcome;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

/// Verdict extrait du contenu LLM
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVerdict {
    pub decision: ModerationOutcome,
    pub confidence: f64,
    pub reasoning: String,
}

/// Motifs d'extraction de JSON embarqué, du plus précis au plus souple
static EMBEDDED_JSON_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"```json\s*(\{.*?\})\s*```",
        r"```\s*(\{.*?\})\s*```",
        r#"(\{[^{}]*"decision"[^{}]*\})"#,
        r#"(\{.*?"decision".*?\})"#,
    ]
    .iter()
    .map(|pattern| {
        RegexBuilder::new(pattern)
            .dot_matches_new_line(true)
            .case_insensitive(true)
            .build()
            .expect("motif d'extraction JSON valide")
    })
    .collect()
});

/// Indices de toxicité dans le texte brut
const TOXIC_INDICATORS: &[&str] = &[
    r#""decision": "toxic""#,
    "decision is toxic",
    "classify as toxic",
    "this is toxic",
    "message is toxic",
    "contains toxic",
    "toxic content",
    "personal attack",
    "harassment",
    "hate speech",
    "inappropriate",
];

/// Indices d'innocuité dans le texte brut
const SAFE_INDICATORS: &[&str] = &[
    r#""decision": "non-toxic""#,
    "decision is non-toxic",
    "not toxic",
    "safe message",
    "no toxicity",
    "appropriate content",
    "friendly",
    "greeting",
];

/// Étage 1: parse le contenu comme du JSON strict
pub fn parse_strict_json(content: &str) -> Option<ParsedVerdict> {
    let value: Value = serde_json::from_str(content.trim()).ok()?;
    verdict_from_value(&value)
}

/// Étage 2: extrait le premier objet JSON embarqué dans le texte
pub fn extract_embedded_json(content: &str) -> Option<ParsedVerdict> {
    for pattern in EMBEDDED_JSON_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(content) {
            if let Some(candidate) = captures.get(1) {
                if let Ok(value) = serde_json::from_str::<Value>(candidate.as_str()) {
                    if let Some(verdict) = verdict_from_value(&value) {
                        tracing::debug!(pattern = %pattern.as_str(), "✅ JSON embarqué extrait");
                        return Some(verdict);
                    }
                }
            }
        }
    }
    None
}

/// Étage 3: classification par mots-clés du texte brut
pub fn keyword_heuristic(content: &str) -> ParsedVerdict {
    let lowered = content.to_lowercase();

    if TOXIC_INDICATORS.iter().any(|phrase| lowered.contains(phrase)) {
        return ParsedVerdict {
            decision: ModerationOutcome::Toxic,
            confidence: 0.7,
            reasoning: "Text analysis - toxic indicators found".to_string(),
        };
    }

    if SAFE_INDICATORS.iter().any(|phrase| lowered.contains(phrase)) {
        return ParsedVerdict {
            decision: ModerationOutcome::NonToxic,
            confidence: 0.7,
            reasoning: "Text analysis - no toxic indicators".to_string(),
        };
    }

    ParsedVerdict {
        decision: ModerationOutcome::NonToxic,
        confidence: 0.5,
        reasoning: "Unable to determine from LLM response".to_string(),
    }
}

/// Applique la cascade complète sur le contenu LLM. Ne peut pas échouer.
pub fn parse_llm_content(content: &str) -> ParsedVerdict {
    if let Some(verdict) = parse_strict_json(content) {
        return verdict;
    }

    tracing::warn!(
        content = %crate::utils::truncate_text(content, 200),
        "⚠️ Réponse non-JSON, parsing de repli"
    );

    if let Some(verdict) = extract_embedded_json(content) {
        return verdict;
    }

    keyword_heuristic(content)
}

/// Lit (decision, confidence, reasoning) dans un objet JSON, avec les
/// valeurs par défaut du contrat
fn verdict_from_value(value: &Value) -> Option<ParsedVerdict> {
    let object = value.as_object()?;

    let decision = match object.get("decision").and_then(Value::as_str) {
        Some(raw) if raw.eq_ignore_ascii_case("toxic") => ModerationOutcome::Toxic,
        Some(raw) if raw.eq_ignore_ascii_case("error") => ModerationOutcome::Error,
        Some(_) | None => ModerationOutcome::NonToxic,
    };

    Some(ParsedVerdict {
        decision,
        confidence: object.get("confidence").and_then(Value::as_f64).unwrap_or(0.5),
        reasoning: object
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strict_json_is_parsed_directly() {
        let verdict = parse_llm_content(
            r#"{"decision": "Toxic", "confidence": 0.95, "reasoning": "personal attack"}"#,
        );
        assert_eq!(verdict.decision, ModerationOutcome::Toxic);
        assert_eq!(verdict.confidence, 0.95);
        assert_eq!(verdict.reasoning, "personal attack");
    }

    #[test]
    fn test_fenced_json_block_is_extracted() {
        let content = "Sure — here is the answer: ```json\n{\"decision\":\"Toxic\",\"confidence\":0.92,\"reasoning\":\"slur\"}\n```";
        let verdict = parse_llm_content(content);

        assert_eq!(verdict.decision, ModerationOutcome::Toxic);
        assert_eq!(verdict.confidence, 0.92);
        assert_eq!(verdict.reasoning, "slur");
    }

    #[test]
    fn test_generic_fence_is_extracted() {
        let content = "Analysis done.\n```\n{\"decision\": \"Non-Toxic\", \"confidence\": 0.88}\n```";
        let verdict = parse_llm_content(content);

        assert_eq!(verdict.decision, ModerationOutcome::NonToxic);
        assert_eq!(verdict.confidence, 0.88);
    }

    #[test]
    fn test_bare_brace_object_with_decision_is_extracted() {
        let content = r#"After review I conclude {"decision": "Toxic", "confidence": 0.8, "reasoning": "threat"} as stated."#;
        let verdict = parse_llm_content(content);

        assert_eq!(verdict.decision, ModerationOutcome::Toxic);
        assert_eq!(verdict.confidence, 0.8);
    }

    #[test]
    fn test_toxic_keyword_heuristic() {
        let verdict = parse_llm_content("This message is a clear personal attack on the streamer.");
        assert_eq!(verdict.decision, ModerationOutcome::Toxic);
        assert_eq!(verdict.confidence, 0.7);
    }

    #[test]
    fn test_safe_keyword_heuristic() {
        let verdict = parse_llm_content("This is a friendly greeting, nothing wrong here.");
        assert_eq!(verdict.decision, ModerationOutcome::NonToxic);
        assert_eq!(verdict.confidence, 0.7);
    }

    #[test]
    fn test_undetermined_content_defaults_to_non_toxic_low_confidence() {
        let verdict = parse_llm_content("lorem ipsum dolor sit amet");
        assert_eq!(verdict.decision, ModerationOutcome::NonToxic);
        assert_eq!(verdict.confidence, 0.5);
        assert_eq!(verdict.reasoning, "Unable to determine from LLM response");
    }

    #[test]
    fn test_missing_fields_take_contract_defaults() {
        let verdict = parse_llm_content(r#"{"decision": "Toxic"}"#);
        assert_eq!(verdict.confidence, 0.5);
        assert_eq!(verdict.reasoning, "");
    }

    #[test]
    fn test_stages_are_independently_callable() {
        assert!(parse_strict_json("not json").is_none());
        assert!(extract_embedded_json("no braces here").is_none());

        let fallback = keyword_heuristic("hate speech detected");
        assert_eq!(fallback.decision, ModerationOutcome::Toxic);
    }
}
