//! # Export Prometheus des métriques du pipeline
//!
//! Chaque binaire installe son propre recorder au démarrage puis sert le
//! rendu en exposition texte sur `GET /metrics`. Les noms de métriques
//! sont le contrat stable des dashboards Grafana.

use crate::error::{ModerationError, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installe le recorder Prometheus global du processus
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ModerationError::configuration_error(format!(
            "Installation du recorder Prometheus impossible: {}",
            e
        )))
}

/// Déclare les métriques du filtre léger
pub fn describe_filter_metrics() {
    describe_counter!(
        "filter_requests_total",
        "Nombre total de requêtes de filtrage, par décision et sous-filtre"
    );
    describe_histogram!(
        "filter_processing_seconds",
        "Temps de traitement des requêtes de filtrage"
    );
    describe_counter!(
        "filter_pattern_matches_total",
        "Correspondances de motifs, par type de motif"
    );
}

/// Déclare les métriques du serveur MCP
pub fn describe_mcp_metrics() {
    describe_counter!(
        "mcp_requests_total",
        "Nombre total de requêtes MCP, par endpoint et statut"
    );
    describe_histogram!(
        "mcp_request_duration_seconds",
        "Durée des requêtes MCP"
    );
    describe_histogram!(
        "llm_response_time_seconds",
        "Temps de réponse du backend LLM"
    );
}

/// Déclare les métriques du moteur de décision
pub fn describe_decision_metrics() {
    describe_counter!(
        "decisions_total",
        "Décisions traitées, par action et sévérité"
    );
    describe_counter!(
        "actions_executed_total",
        "Actions exécutées, par type d'action"
    );
    describe_histogram!(
        "decision_processing_seconds",
        "Temps de traitement des décisions"
    );
}

/// Déclare les métriques de l'ingress / simulateur
pub fn describe_simulator_metrics() {
    describe_counter!(
        "chat_messages_total",
        "Messages de chat traités, par type de message et décision"
    );
    describe_histogram!(
        "chat_message_processing_seconds",
        "Temps de traversée du pipeline par message"
    );
    describe_gauge!(
        "chat_active_websocket_connections",
        "Connexions WebSocket actives"
    );
    describe_counter!(
        "chat_moderation_requests_total",
        "Requêtes de modération émises, par statut"
    );
    describe_counter!(
        "chat_filter_requests_total",
        "Requêtes de filtrage émises, par statut"
    );
}

/// Déclare les métriques de l'évaluateur
pub fn describe_evaluator_metrics() {
    describe_counter!("evaluations_total", "Évaluations effectuées");
    describe_gauge!("system_accuracy", "Précision courante du système");
    describe_gauge!("average_latency_seconds", "Latence moyenne du système");
    describe_gauge!("messages_per_second", "Débit de messages traités");
}
