//! Surface HTTP du moteur de décision
//!
//! `/process` doit rester rapide: la persistance part sur des tâches de
//! fond et ses échecs n'affectent jamais la réponse synchrone.

use crate::error::Result;
use crate::models::{ActionResponse, ModerationDecision};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use super::actions::ActionExecutor;
use super::store::DecisionStore;

/// Seuil de confiance au-delà duquel une décision compte comme violation
pub const VIOLATION_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// État partagé du moteur de décision
#[derive(Clone)]
pub struct DecisionState {
    pub store: Arc<DecisionStore>,
    pub executor: Arc<ActionExecutor>,
    pub prometheus: PrometheusHandle,
}

/// Construit le routeur du service
pub fn router(state: DecisionState) -> Router {
    Router::new()
        .route("/process", post(process_decision))
        .route("/user/:user_id/history", get(get_user_violations))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

/// Applique la politique à une décision de modération et exécute l'action
async fn process_decision(
    State(state): State<DecisionState>,
    Json(decision): Json<ModerationDecision>,
) -> Result<Json<ActionResponse>> {
    let started = Instant::now();

    // Historique de violations: absent = zéro
    let violation_count = state
        .store
        .get_user_history(&decision.user_id)
        .await?
        .map(|history| history.violation_count)
        .unwrap_or(0);

    let action = super::determine_action(&decision, violation_count);
    let response = state.executor.execute(action, &decision).await;

    // Persistance fire-and-forget: le journal d'audit porte son propre
    // timestamp, l'ordre d'écriture peut différer de l'ordre d'arrivée
    let store = Arc::clone(&state.store);
    let record = decision.clone();
    tokio::spawn(async move {
        if let Err(e) = store.record_decision(&record, action).await {
            tracing::error!(error = %e, user_id = %record.user_id, "❌ Échec d'enregistrement de la décision");
        }

        if record.confidence > VIOLATION_CONFIDENCE_THRESHOLD {
            if let Err(e) = store.update_user_history(&record.user_id, record.confidence).await {
                tracing::error!(error = %e, user_id = %record.user_id, "❌ Échec de mise à jour des violations");
            }
        }
    });

    counter!(
        "decisions_total",
        "action" => action.to_string(),
        "severity" => decision.severity.to_string(),
    )
    .increment(1);
    counter!("actions_executed_total", "action_type" => action.to_string()).increment(1);
    histogram!("decision_processing_seconds").record(started.elapsed().as_secs_f64());

    Ok(Json(response))
}

/// Instantané des violations d'un utilisateur
async fn get_user_violations(
    State(state): State<DecisionState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    match state.store.get_user_history(&user_id).await? {
        Some(history) => Ok(Json(json!({
            "user_id": history.user_id,
            "violation_count": history.violation_count,
            "total_score": history.total_score,
            "last_violation": history.last_violation,
            "status": history.status,
        }))),
        None => Ok(Json(json!({
            "user_id": user_id,
            "violations": 0,
            "status": "clean",
        }))),
    }
}

/// Vérification de santé
async fn health_check(State(state): State<DecisionState>) -> Json<serde_json::Value> {
    let database_connected = !state.store.pool().is_closed();
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "database_connected": database_connected,
    }))
}

/// Exposition Prometheus
async fn get_metrics(State(state): State<DecisionState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus.render(),
    )
}
