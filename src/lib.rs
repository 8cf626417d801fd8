//! # Moderation Server - Bibliothèque principale
//!
//! Pipeline de modération de chat temps réel: filtre léger → serveur MCP
//! (LLM) → moteur de décision, piloté par un simulateur de chat et
//! supervisé par un évaluateur de métriques. Chaque composant est un
//! service axum indépendant; cette bibliothèque porte leur logique et
//! leurs routeurs.

// ═══════════════════════════════════════════════════════════════════════
// MODULES CORE
// ═══════════════════════════════════════════════════════════════════════

/// Gestion des erreurs du pipeline
pub mod error;

/// Modèle de données sur le fil
pub mod models;

/// Configuration des services
pub mod config;

/// Export Prometheus
pub mod metrics;

/// Webhook de notification
pub mod notifier;

/// Utilitaires généraux
pub mod utils;

// ═══════════════════════════════════════════════════════════════════════
// COMPOSANTS DU PIPELINE
// ═══════════════════════════════════════════════════════════════════════

/// Filtre léger: pré-classification sub-milliseconde
pub mod filter;

/// Serveur MCP: templates, garde anti-injection, dispatch LLM
pub mod mcp;

/// Moteur de décision: politique, escalade, persistance
pub mod decision;

/// Ingress / simulateur: WebSocket, REST, générateur
pub mod simulator;

/// Évaluateur de métriques
pub mod evaluator;

// ═══════════════════════════════════════════════════════════════════════
// RE-EXPORTS PUBLICS
// ═══════════════════════════════════════════════════════════════════════

pub use config::CliArgs;
pub use error::{ModerationError, Result};
pub use models::{
    ActionResponse, ActionType, ChatMessage, FilterDecision, FilterType, FilterVerdict,
    ModerationDecision, ModerationOutcome, ModerationRequest, ModerationVerdict, PipelineResult,
    Severity, UserMessage,
};

/// Initialise le logging structuré du service. Format JSON en
/// production, console colorée sinon; le niveau se pilote par RUST_LOG.
pub fn init_tracing(service: &str, production: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if production {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    tracing::info!(service = %service, "🚀 Logging initialisé");
}
