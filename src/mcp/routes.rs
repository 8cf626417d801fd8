//! Surface HTTP du serveur MCP

use crate::error::Result;
use crate::models::{ModerationRequest, ModerationVerdict};
use axum::extract::State;
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

use super::McpServer;

/// État partagé du serveur MCP
#[derive(Clone)]
pub struct McpState {
    pub server: Arc<McpServer>,
    pub prometheus: PrometheusHandle,
}

/// Construit le routeur du service
pub fn router(state: McpState) -> Router {
    Router::new()
        .route("/moderate", post(moderate_message))
        .route("/templates", get(list_templates))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

/// Modère un message via le backend LLM
async fn moderate_message(
    State(state): State<McpState>,
    Json(request): Json<ModerationRequest>,
) -> Result<Json<ModerationVerdict>> {
    counter!("mcp_requests_total", "endpoint" => "moderate", "status" => "started").increment(1);
    let started = Instant::now();

    let outcome = state.server.moderate(&request).await;
    histogram!("mcp_request_duration_seconds").record(started.elapsed().as_secs_f64());

    match outcome {
        Ok(verdict) => {
            counter!("mcp_requests_total", "endpoint" => "moderate", "status" => "success")
                .increment(1);

            tracing::info!(
                user_id = %request.user_id,
                decision = %verdict.decision,
                confidence = verdict.confidence,
                template_version = %verdict.template_version,
                "⚖️ Verdict de modération rendu"
            );
            Ok(Json(verdict))
        }
        Err(e) => {
            counter!("mcp_requests_total", "endpoint" => "moderate", "status" => "error")
                .increment(1);
            Err(e)
        }
    }
}

/// Liste les templates disponibles
async fn list_templates(State(state): State<McpState>) -> Json<serde_json::Value> {
    Json(json!({ "templates": state.server.template_names() }))
}

/// Vérification de santé
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
    }))
}

/// Exposition Prometheus
async fn get_metrics(State(state): State<McpState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus.render(),
    )
}
