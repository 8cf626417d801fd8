//! # Gestion d'erreurs unifiée du pipeline de modération
//!
//! Ce module fournit un système d'erreurs cohérent avec:
//! - Catégorisation des erreurs par domaine (entrée, backend, persistance)
//! - Codes HTTP standardisés
//! - Sévérité pour le logging
//! - Sérialisation pour l'API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Type alias pour Result avec notre erreur personnalisée
pub type Result<T> = std::result::Result<T, ModerationError>;

/// Erreurs principales du pipeline de modération
#[derive(Error, Debug)]
pub enum ModerationError {
    // ═══════════════════════════════════════════════════════════════════════
    // ERREURS D'ENTRÉE (InputInvalid)
    // ═══════════════════════════════════════════════════════════════════════

    /// Message trop long pour être traité
    #[error("Message trop long: {actual} caractères (max: {max})")]
    MessageTooLong { actual: usize, max: usize },

    /// Tentative d'injection de prompt détectée
    #[error("Tentative d'injection détectée: motif '{pattern}'")]
    InjectionAttempt { pattern: String },

    /// Format de données invalide
    #[error("Format invalide pour {field}: {reason}")]
    InvalidFormat { field: String, reason: String },

    // ═══════════════════════════════════════════════════════════════════════
    // ERREURS DE BACKEND (BackendUnavailable)
    // ═══════════════════════════════════════════════════════════════════════

    /// Backend LLM injoignable après épuisement des tentatives
    #[error("Service {service} indisponible: {reason}")]
    BackendUnavailable { service: String, reason: String },

    /// Erreur HTTP vers un service amont (filtre, MCP, décision)
    #[error("Erreur réseau vers {service}: {source}")]
    Upstream {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    /// Timeout de connexion
    #[error("Timeout après {seconds}s vers {service}")]
    Timeout { service: String, seconds: u64 },

    // ═══════════════════════════════════════════════════════════════════════
    // ERREURS DE PERSISTANCE (PersistenceFailure)
    // ═══════════════════════════════════════════════════════════════════════

    /// Erreur de base de données
    #[error("Erreur base de données: {operation}")]
    Database {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    /// Ressource non trouvée
    #[error("{resource} non trouvé(e): {id}")]
    NotFound { resource: String, id: String },

    // ═══════════════════════════════════════════════════════════════════════
    // ERREURS DE NOTIFICATION (TransientNotifier)
    // ═══════════════════════════════════════════════════════════════════════

    /// Échec de livraison du webhook de notification
    #[error("Notification webhook échouée: {reason}")]
    NotifierFailed { reason: String },

    // ═══════════════════════════════════════════════════════════════════════
    // ERREURS DE PARSING (ParseFailure)
    // ═══════════════════════════════════════════════════════════════════════

    /// Réponse LLM illisible (le cascade de repli a aussi échoué)
    #[error("Erreur de parsing: {reason}")]
    ParseError { reason: String },

    /// Erreur de sérialisation JSON
    #[error("Erreur JSON: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // ERREURS SYSTÈME ET CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Erreur de configuration
    #[error("Erreur configuration: {message}")]
    Configuration { message: String },

    /// Erreur WebSocket
    #[error("Erreur WebSocket: {reason}")]
    WebSocket { reason: String },

    /// Erreur d'entrée/sortie (bind, lecture de fichier)
    #[error("Erreur E/S: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },

    /// Erreur interne non spécifiée
    #[error("Erreur interne: {message}")]
    Internal { message: String },
}

/// Sévérité d'une erreur pour le logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Low,
    Medium,
    High,
}

impl ModerationError {
    /// Retourne le code d'erreur HTTP approprié
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 400 Bad Request — rejet avant tout appel backend
            Self::MessageTooLong { .. }
            | Self::InjectionAttempt { .. }
            | Self::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            Self::NotFound { .. } => StatusCode::NOT_FOUND,

            // 503 Service Unavailable — LLM injoignable après retries
            Self::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,

            // 502 Bad Gateway — service amont en erreur
            Self::Upstream { .. } | Self::Timeout { .. } => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            Self::Database { .. }
            | Self::NotifierFailed { .. }
            | Self::ParseError { .. }
            | Self::Json { .. }
            | Self::Configuration { .. }
            | Self::WebSocket { .. }
            | Self::Io { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Retourne la sévérité de l'erreur pour les logs
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Database { .. } | Self::BackendUnavailable { .. } | Self::Io { .. } => {
                ErrorSeverity::High
            }

            Self::InjectionAttempt { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => ErrorSeverity::Medium,

            Self::MessageTooLong { .. }
            | Self::InvalidFormat { .. }
            | Self::Upstream { .. }
            | Self::Timeout { .. }
            | Self::ParseError { .. } => ErrorSeverity::Low,

            Self::NotFound { .. }
            | Self::NotifierFailed { .. }
            | Self::Json { .. }
            | Self::WebSocket { .. } => ErrorSeverity::Info,
        }
    }

    /// Retourne un message d'erreur sécurisé pour le client
    pub fn public_message(&self) -> String {
        match self {
            Self::MessageTooLong { max, .. } => {
                format!("Message trop long (max: {} caractères)", max)
            }
            Self::InjectionAttempt { .. } => "Entrée invalide détectée".to_string(),
            Self::InvalidFormat { field, .. } => format!("Format invalide pour {}", field),
            Self::NotFound { resource, id } => format!("{} '{}' introuvable", resource, id),
            Self::BackendUnavailable { service, .. } => {
                format!("Service {} temporairement indisponible", service)
            }
            Self::Upstream { service, .. } | Self::Timeout { service, .. } => {
                format!("Service {} injoignable", service)
            }
            // Les détails internes ne sortent jamais vers le client
            _ => "Erreur interne du serveur".to_string(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CONSTRUCTEURS UTILITAIRES
    // ═══════════════════════════════════════════════════════════════════════

    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn message_too_long(actual: usize, max: usize) -> Self {
        Self::MessageTooLong { actual, max }
    }

    pub fn injection_attempt(pattern: impl Into<String>) -> Self {
        Self::InjectionAttempt { pattern: pattern.into() }
    }

    pub fn from_sqlx_error(operation: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Database { operation: operation.into(), source }
    }

    pub fn upstream(service: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Upstream { service: service.into(), source }
    }

    pub fn backend_unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable { service: service.into(), reason: reason.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl From<serde_json::Error> for ModerationError {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source }
    }
}

impl From<std::io::Error> for ModerationError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

impl IntoResponse for ModerationError {
    fn into_response(self) -> Response {
        let status = self.http_status();

        match self.severity() {
            ErrorSeverity::High => tracing::error!(error = %self, "❌ Erreur traitée"),
            ErrorSeverity::Medium => tracing::warn!(error = %self, "⚠️ Erreur traitée"),
            ErrorSeverity::Low | ErrorSeverity::Info => {
                tracing::debug!(error = %self, "Erreur traitée")
            }
        }

        let body = Json(json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_map_to_400() {
        assert_eq!(
            ModerationError::message_too_long(2500, 2000).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ModerationError::injection_attempt("system:").http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_backend_unavailable_maps_to_503() {
        let err = ModerationError::backend_unavailable("llm", "connexion refusée");
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = ModerationError::internal("pool exhausted at worker 3");
        assert!(!err.public_message().contains("pool"));
    }
}
