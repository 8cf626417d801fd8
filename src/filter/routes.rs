//! Surface HTTP du filtre léger

use crate::error::Result;
use crate::models::ChatMessage;
use crate::utils::truncate_text;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::LightweightFilter;

/// État partagé du service de filtrage
#[derive(Clone)]
pub struct FilterState {
    pub filter: Arc<LightweightFilter>,
    pub prometheus: PrometheusHandle,
}

/// Construit le routeur du service
pub fn router(state: FilterState) -> Router {
    Router::new()
        .route("/filter", post(filter_message))
        .route("/config", get(get_config))
        .route("/config/toggle/:name", post(toggle_filter))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/stats", get(get_stats))
        .with_state(state)
}

/// Filtre un message de chat
async fn filter_message(
    State(state): State<FilterState>,
    Json(message): Json<ChatMessage>,
) -> Json<crate::models::FilterVerdict> {
    let verdict = state.filter.process(&message);

    counter!(
        "filter_requests_total",
        "decision" => verdict.decision.to_string(),
        "filter_type" => verdict.filter_type.to_string(),
    )
    .increment(1);
    histogram!("filter_processing_seconds").record(verdict.processing_time_ms / 1000.0);
    for _ in &verdict.matched_patterns {
        counter!(
            "filter_pattern_matches_total",
            "pattern_type" => verdict.filter_type.to_string(),
        )
        .increment(1);
    }

    tracing::info!(
        username = %message.username,
        message = %truncate_text(&message.message, 50),
        decision = %verdict.decision,
        processing_time_ms = verdict.processing_time_ms,
        "🔍 Message filtré"
    );

    Json(verdict)
}

/// Configuration courante du filtre
async fn get_config(State(state): State<FilterState>) -> Json<serde_json::Value> {
    let stats = state.filter.stats();
    let settings = state.filter.settings();

    Json(json!({
        "enabled_filters": stats.enabled_filters,
        "banned_words_count": stats.total_banned_words,
        "profanity_words_count": stats.total_profanity_words,
        "rate_limit_window": settings.rate_limit_window.as_secs(),
        "max_messages_per_window": settings.max_messages_per_window,
    }))
}

#[derive(Debug, Deserialize)]
struct ToggleParams {
    enabled: bool,
}

/// Active ou désactive un sous-filtre à chaud
async fn toggle_filter(
    State(state): State<FilterState>,
    Path(name): Path<String>,
    Query(params): Query<ToggleParams>,
) -> Result<Json<serde_json::Value>> {
    state.filter.toggle(&name, params.enabled)?;

    let status = if params.enabled { "enabled" } else { "disabled" };
    Ok(Json(json!({
        "message": format!("Filter '{}' {}", name, status),
    })))
}

/// Vérification de santé
async fn health_check(State(state): State<FilterState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "filters_enabled": state.filter.toggles(),
        "timestamp": Utc::now(),
    }))
}

/// Exposition Prometheus
async fn get_metrics(State(state): State<FilterState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus.render(),
    )
}

/// Statistiques du filtre
async fn get_stats(State(state): State<FilterState>) -> Json<serde_json::Value> {
    let stats = state.filter.stats();
    Json(json!({
        "active_users": stats.active_users,
        "total_banned_words": stats.total_banned_words,
        "total_profanity_words": stats.total_profanity_words,
        "enabled_filters": stats.enabled_filters,
    }))
}
