//! Utilitaires généraux

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Génère un nouvel UUID v4
pub fn generate_id() -> Uuid {
    Uuid::new_v4()
}

/// Retourne le timestamp UTC actuel
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Tronque un texte à une longueur donnée, sans couper un codepoint
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
