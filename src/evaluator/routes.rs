//! Surface HTTP de l'évaluateur de métriques

use crate::error::Result;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{AccuracyReport, MetricsEvaluator, PerformanceReport, SystemMetrics};

/// État partagé de l'évaluateur
#[derive(Clone)]
pub struct EvaluatorState {
    pub evaluator: Arc<MetricsEvaluator>,
    pub prometheus: PrometheusHandle,
}

/// Construit le routeur du service
pub fn router(state: EvaluatorState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics/system", get(get_system_metrics))
        .route("/metrics/accuracy", get(get_accuracy_report))
        .route("/metrics/performance", get(get_performance_report))
        .route("/health/system", get(get_system_health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PeriodParams {
    #[serde(default = "default_period_hours")]
    period_hours: i32,
}

fn default_period_hours() -> i32 {
    24
}

/// Vérification de santé
async fn health_check(State(state): State<EvaluatorState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "database_connected": !state.evaluator.pool().is_closed(),
    }))
}

/// Instantané des métriques système, historisé à chaque lecture
async fn get_system_metrics(State(state): State<EvaluatorState>) -> Result<Json<SystemMetrics>> {
    let metrics = state.evaluator.generate_system_metrics().await?;
    state.evaluator.store_metrics(&metrics).await?;

    counter!("evaluations_total").increment(1);
    Ok(Json(metrics))
}

/// Rapport de précision sur la période demandée
async fn get_accuracy_report(
    State(state): State<EvaluatorState>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<AccuracyReport>> {
    let report = state.evaluator.generate_accuracy_report(params.period_hours).await?;
    Ok(Json(report))
}

/// Rapport de performance sur la période demandée
async fn get_performance_report(
    State(state): State<EvaluatorState>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<PerformanceReport>> {
    let report = state
        .evaluator
        .generate_performance_report(params.period_hours)
        .await?;
    Ok(Json(report))
}

/// Santé globale avec alertes à seuils
async fn get_system_health(State(state): State<EvaluatorState>) -> Result<Json<serde_json::Value>> {
    let health = state.evaluator.check_system_health().await?;
    Ok(Json(health))
}

/// Exposition Prometheus
async fn get_metrics(State(state): State<EvaluatorState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus.render(),
    )
}
