//! Garde d'entrée anti-injection du serveur MCP
//!
//! Toute requête rejetée ici ne déclenche ni appel LLM ni écriture en
//! base: le rejet est un 400 immédiat.

use crate::error::{ModerationError, Result};
use crate::models::ModerationRequest;

/// Taille maximale d'un message accepté
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Motifs d'injection de prompt, comparés au message en minuscules
pub const INJECTION_PATTERNS: &[&str] = &[
    "ignore previous instructions",
    "system:",
    "assistant:",
    "user:",
    "prompt:",
    "###",
    "---",
];

/// Valide une requête de modération avant tout appel backend
pub fn validate_request(request: &ModerationRequest) -> Result<()> {
    if request.message.len() > MAX_MESSAGE_LENGTH {
        tracing::warn!(
            user_id = %request.user_id,
            length = request.message.len(),
            "⚠️ Message trop long rejeté"
        );
        return Err(ModerationError::message_too_long(
            request.message.len(),
            MAX_MESSAGE_LENGTH,
        ));
    }

    let lowered = request.message.to_lowercase();
    for pattern in INJECTION_PATTERNS {
        if lowered.contains(pattern) {
            tracing::warn!(
                user_id = %request.user_id,
                pattern = %pattern,
                "🚨 Injection de prompt potentielle détectée"
            );
            return Err(ModerationError::injection_attempt(*pattern));
        }
    }

    Ok(())
}
