//! Modèle de données du pipeline de modération
//!
//! Toutes les structures qui circulent sur le fil (JSON) entre les
//! services: message de chat, verdicts du filtre et du MCP, décision de
//! modération et réponse d'action. Les noms de champs sérialisés sont le
//! contrat stable de l'API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
// MESSAGE DE CHAT
// ═══════════════════════════════════════════════════════════════════════

/// Type d'un message entrant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Audio,
    System,
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Text
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Audio => write!(f, "audio"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Message de chat — immuable une fois construit, détruit après la
/// persistance de la décision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user_id: String,
    pub username: String,
    pub channel_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Message soumis par un utilisateur via l'API REST de l'ingress
#[derive(Debug, Clone, Deserialize)]
pub struct UserMessage {
    pub message: String,
    #[serde(default = "default_web_user_id")]
    pub user_id: String,
    #[serde(default = "default_web_username")]
    pub username: String,
    #[serde(default = "default_web_channel")]
    pub channel_id: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

fn default_web_user_id() -> String {
    "user_web".to_string()
}

fn default_web_username() -> String {
    "WebUser".to_string()
}

fn default_web_channel() -> String {
    "web-chat".to_string()
}

impl UserMessage {
    /// Convertit la soumission REST en message de pipeline
    pub fn into_chat_message(self) -> ChatMessage {
        ChatMessage {
            user_id: self.user_id,
            username: self.username,
            channel_id: self.channel_id,
            message: self.message,
            timestamp: Utc::now(),
            message_type: MessageType::Text,
            metadata: self.metadata,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// VERDICT DU FILTRE LÉGER
// ═══════════════════════════════════════════════════════════════════════

/// Décision du filtre léger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDecision {
    Pass,
    Flagged,
    LikelyToxic,
    LikelySpam,
    BlockPii,
    RateLimited,
}

impl fmt::Display for FilterDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Flagged => write!(f, "flagged"),
            Self::LikelyToxic => write!(f, "likely_toxic"),
            Self::LikelySpam => write!(f, "likely_spam"),
            Self::BlockPii => write!(f, "block_pii"),
            Self::RateLimited => write!(f, "rate_limited"),
        }
    }
}

/// Sous-filtre à l'origine du verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Keyword,
    Profanity,
    RateLimit,
    Combined,
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword => write!(f, "keyword"),
            Self::Profanity => write!(f, "profanity"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Combined => write!(f, "combined"),
        }
    }
}

/// Verdict rendu par le filtre léger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterVerdict {
    /// Faut-il continuer vers le MCP ?
    pub should_process: bool,
    pub decision: FilterDecision,
    pub confidence: f64,
    #[serde(default)]
    pub matched_patterns: Vec<String>,
    pub filter_type: FilterType,
    pub processing_time_ms: f64,
}

impl FilterVerdict {
    /// Verdict synthétisé quand le filtre est injoignable (fail-open)
    pub fn synthesized_pass() -> Self {
        Self {
            should_process: true,
            decision: FilterDecision::Pass,
            confidence: 0.5,
            matched_patterns: Vec::new(),
            filter_type: FilterType::Combined,
            processing_time_ms: 0.0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// VERDICT DE MODÉRATION (MCP)
// ═══════════════════════════════════════════════════════════════════════

/// Issue d'une modération LLM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModerationOutcome {
    #[serde(rename = "Toxic")]
    Toxic,
    #[serde(rename = "Non-Toxic")]
    NonToxic,
    #[serde(rename = "Error")]
    Error,
}

impl fmt::Display for ModerationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toxic => write!(f, "Toxic"),
            Self::NonToxic => write!(f, "Non-Toxic"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// Requête de modération vers le serveur MCP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRequest {
    pub message: String,
    pub user_id: String,
    pub channel_id: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_template_name")]
    pub template_name: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

pub fn default_template_name() -> String {
    "moderation_prompt".to_string()
}

/// Verdict rendu par le serveur MCP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub decision: ModerationOutcome,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    pub processing_time_ms: f64,
    pub template_version: String,
}

impl ModerationVerdict {
    /// Verdict d'erreur en bande (backend injoignable, timeout…)
    pub fn error(reasoning: impl Into<String>, processing_time_ms: f64) -> Self {
        Self {
            decision: ModerationOutcome::Error,
            confidence: 0.0,
            reasoning: reasoning.into(),
            processing_time_ms,
            template_version: String::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// DÉCISION ET ACTION
// ═══════════════════════════════════════════════════════════════════════

/// Sévérité d'une décision de modération
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Action de modération exécutable, ordonnée par gravité croissante
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    None,
    Warn,
    Timeout,
    Kick,
    Ban,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Warn => write!(f, "warn"),
            Self::Timeout => write!(f, "timeout"),
            Self::Kick => write!(f, "kick"),
            Self::Ban => write!(f, "ban"),
        }
    }
}

/// Décision de modération soumise au moteur de politique
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationDecision {
    pub user_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub message_id: Option<String>,
    pub decision: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Réponse du moteur de décision après exécution de l'action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub action_taken: ActionType,
    pub success: bool,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Instantané des violations d'un utilisateur (table `user_violations`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserViolationSnapshot {
    pub user_id: String,
    pub violation_count: i32,
    pub total_score: f64,
    pub last_violation: Option<DateTime<Utc>>,
    pub status: String,
}

// ═══════════════════════════════════════════════════════════════════════
// RÉSULTAT DE PIPELINE (diffusion WebSocket)
// ═══════════════════════════════════════════════════════════════════════

/// Enregistrement complet diffusé aux abonnés WebSocket et retourné aux
/// appelants REST
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: ChatMessage,
    pub filter_result: FilterVerdict,
    pub moderation_result: Option<ModerationVerdict>,
    pub processing_time_ms: f64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_decision_wire_names() {
        let json = serde_json::to_string(&FilterDecision::BlockPii).unwrap();
        assert_eq!(json, "\"block_pii\"");
        let json = serde_json::to_string(&FilterDecision::RateLimited).unwrap();
        assert_eq!(json, "\"rate_limited\"");
        let json = serde_json::to_string(&FilterType::RateLimit).unwrap();
        assert_eq!(json, "\"rate_limit\"");
    }

    #[test]
    fn test_moderation_outcome_wire_names() {
        assert_eq!(
            serde_json::to_string(&ModerationOutcome::NonToxic).unwrap(),
            "\"Non-Toxic\""
        );
        let parsed: ModerationOutcome = serde_json::from_str("\"Toxic\"").unwrap();
        assert_eq!(parsed, ModerationOutcome::Toxic);
    }

    #[test]
    fn test_decision_defaults_to_medium_severity() {
        let decision: ModerationDecision = serde_json::from_str(
            r#"{"user_id":"u1","channel_id":"general","decision":"Toxic","confidence":0.85}"#,
        )
        .unwrap();
        assert_eq!(decision.severity, Severity::Medium);
        assert!(decision.message_id.is_none());
    }

    #[test]
    fn test_user_message_defaults() {
        let msg: UserMessage = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert_eq!(msg.user_id, "user_web");
        assert_eq!(msg.username, "WebUser");
        assert_eq!(msg.channel_id, "web-chat");
    }

    #[test]
    fn test_action_ordering() {
        assert!(ActionType::Warn < ActionType::Timeout);
        assert!(ActionType::Timeout < ActionType::Kick);
        assert!(ActionType::Kick < ActionType::Ban);
    }
}
