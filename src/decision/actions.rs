//! Exécution des actions de modération
//!
//! Chaque action est un événement observable: log structuré + poste
//! optionnel vers le webhook de notification. Un échec d'exécution
//! produit une réponse `success: false` mais n'empêche jamais
//! l'enregistrement de la décision.

use crate::models::{ActionResponse, ActionType, ModerationDecision};
use crate::notifier::Notifier;
use chrono::Utc;

/// Durée fixe d'un timeout, en secondes
pub const TIMEOUT_DURATION_SECS: u64 = 300;

/// Exécuteur d'actions avec notifications sortantes
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    notifier: Notifier,
}

impl ActionExecutor {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    /// Exécute l'action déterminée par le moteur de politique
    pub async fn execute(&self, action: ActionType, decision: &ModerationDecision) -> ActionResponse {
        let reasoning = decision.reasoning.as_deref().unwrap_or("");

        match action {
            ActionType::Warn => {
                tracing::info!(
                    user_id = %decision.user_id,
                    channel_id = %decision.channel_id,
                    "⚠️ Avertissement utilisateur"
                );
                self.notifier
                    .notify(&format!(
                        "⚠️ User {} warned for: {}",
                        decision.user_id, reasoning
                    ))
                    .await;

                self.success(action, format!("User warned for: {}", reasoning))
            }

            ActionType::Timeout => {
                tracing::info!(
                    user_id = %decision.user_id,
                    duration_secs = TIMEOUT_DURATION_SECS,
                    "⏰ Timeout utilisateur"
                );
                self.notifier
                    .notify(&format!(
                        "⏰ User {} timed out for 5 minutes: {}",
                        decision.user_id, reasoning
                    ))
                    .await;

                self.success(
                    action,
                    format!("User timed out for {} seconds", TIMEOUT_DURATION_SECS),
                )
            }

            ActionType::Kick => {
                tracing::info!(
                    user_id = %decision.user_id,
                    channel_id = %decision.channel_id,
                    "👢 Expulsion utilisateur"
                );
                self.notifier
                    .notify(&format!("👢 User {} kicked: {}", decision.user_id, reasoning))
                    .await;

                self.success(action, "User kicked from channel".to_string())
            }

            ActionType::Ban => {
                tracing::warn!(user_id = %decision.user_id, "🔨 Bannissement utilisateur");
                self.notifier
                    .notify(&format!("🔨 User {} banned: {}", decision.user_id, reasoning))
                    .await;

                self.success(action, "User permanently banned".to_string())
            }

            ActionType::None => ActionResponse {
                action_taken: ActionType::None,
                success: true,
                details: Some("No action required".to_string()),
                timestamp: Utc::now(),
            },
        }
    }

    fn success(&self, action: ActionType, details: String) -> ActionResponse {
        ActionResponse {
            action_taken: action,
            success: true,
            details: Some(details),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotifierConfig;
    use crate::models::Severity;

    fn decision() -> ModerationDecision {
        ModerationDecision {
            user_id: "user_0001".to_string(),
            channel_id: "general".to_string(),
            message_id: None,
            decision: "Toxic".to_string(),
            confidence: 0.85,
            reasoning: Some("harassment".to_string()),
            severity: Severity::Medium,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_warn_succeeds_without_webhook() {
        let executor = ActionExecutor::new(Notifier::new(NotifierConfig::default()));
        let response = executor.execute(ActionType::Warn, &decision()).await;

        assert_eq!(response.action_taken, ActionType::Warn);
        assert!(response.success);
        assert!(response.details.unwrap().contains("harassment"));
    }

    #[tokio::test]
    async fn test_timeout_reports_fixed_duration() {
        let executor = ActionExecutor::new(Notifier::new(NotifierConfig::default()));
        let response = executor.execute(ActionType::Timeout, &decision()).await;

        assert!(response.success);
        assert!(response.details.unwrap().contains("300 seconds"));
    }

    #[tokio::test]
    async fn test_none_action_is_a_noop() {
        let executor = ActionExecutor::new(Notifier::new(NotifierConfig::default()));
        let response = executor.execute(ActionType::None, &decision()).await;

        assert_eq!(response.action_taken, ActionType::None);
        assert!(response.success);
    }
}
