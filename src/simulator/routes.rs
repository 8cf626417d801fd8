//! Surface HTTP et WebSocket de l'ingress

use crate::error::Result;
use crate::models::UserMessage;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::generator::MessageKind;
use super::{pipeline, simulate_chat_stream, SimulatorState};

/// Construit le routeur de l'ingress
pub fn router(state: SimulatorState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/send-message", post(send_user_message))
        .route("/simulate/single", post(simulate_single_message))
        .route("/simulate/start", post(start_simulation))
        .route("/simulate/stop", post(stop_simulation))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/api/stats", get(get_stats))
        .with_state(state)
}

// ═══════════════════════════════════════════════════════════════════════
// WEBSOCKET
// ═══════════════════════════════════════════════════════════════════════

/// Handler d'upgrade WebSocket
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SimulatorState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Gestion d'une connexion WebSocket individuelle: frames de contrôle en
/// entrée, flux de résultats de pipeline en sortie
async fn handle_websocket(socket: WebSocket, state: SimulatorState) {
    let (mut sender, mut receiver) = socket.split();

    // Canal d'envoi dédié: la diffusion du hub écrit ici, une tâche
    // locale pousse vers la socket
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let peer_id = state.hub.add_peer(tx).await;

    let mut forward_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            // La tâche d'écriture est morte: la socket est fermée
            _ = &mut forward_task => break,

            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = handle_control_frame(&text, &state).await {
                            tracing::warn!(error = %e, "⚠️ Frame de contrôle invalide");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ping/Pong gérés par axum, binaire ignoré
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "⚠️ Erreur WebSocket");
                        break;
                    }
                }
            }
        }
    }

    forward_task.abort();
    state.hub.remove_peer(peer_id).await;
}

/// Traite une frame de contrôle `{"action": …}`
async fn handle_control_frame(text: &str, state: &SimulatorState) -> Result<()> {
    let command: Value = serde_json::from_str(text)?;

    match command.get("action").and_then(Value::as_str) {
        Some("start_simulation") => {
            if state.hub.try_start_simulation() {
                tokio::spawn(simulate_chat_stream(state.clone()));
            }
            state
                .hub
                .broadcast(&json!({"type": "status", "message": "Simulation started"}))
                .await;
        }
        Some("stop_simulation") => {
            state.hub.stop_simulation();
            state
                .hub
                .broadcast(&json!({"type": "status", "message": "Simulation stopped"}))
                .await;
        }
        other => {
            tracing::debug!(action = ?other, "Frame de contrôle ignorée");
        }
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// REST
// ═══════════════════════════════════════════════════════════════════════

/// Ingestion synchrone d'un message utilisateur
async fn send_user_message(
    State(state): State<SimulatorState>,
    Json(user_message): Json<UserMessage>,
) -> Json<Value> {
    let message = user_message.into_chat_message();
    let result = pipeline::process_message(&state.pipeline, message).await;

    state.hub.broadcast(&pipeline::broadcast_payload(&result)).await;

    Json(json!({ "status": "success", "result": result }))
}

#[derive(Debug, Deserialize)]
struct SimulateParams {
    #[serde(default = "default_message_type")]
    message_type: String,
}

fn default_message_type() -> String {
    "normal".to_string()
}

/// Génère et traite un unique message synthétique
async fn simulate_single_message(
    State(state): State<SimulatorState>,
    Query(params): Query<SimulateParams>,
) -> Result<Json<Value>> {
    let kind: MessageKind = params.message_type.parse().map_err(|reason| {
        crate::error::ModerationError::InvalidFormat {
            field: "message_type".to_string(),
            reason,
        }
    })?;

    let message = state.generator.generate(Some(kind));
    let result = pipeline::process_message(&state.pipeline, message).await;

    Ok(Json(json!({
        "message": result.message,
        "filter_result": result.filter_result,
        "moderation_result": result.moderation_result,
        "processing_time_ms": result.processing_time_ms,
    })))
}

/// Démarre la boucle de génération continue
async fn start_simulation(State(state): State<SimulatorState>) -> Json<Value> {
    if state.hub.try_start_simulation() {
        tokio::spawn(simulate_chat_stream(state.clone()));
        Json(json!({ "status": "Simulation started" }))
    } else {
        Json(json!({ "status": "Simulation already running" }))
    }
}

/// Arrête la boucle de génération
async fn stop_simulation(State(state): State<SimulatorState>) -> Json<Value> {
    state.hub.stop_simulation();
    Json(json!({ "status": "Simulation stopped" }))
}

/// Vérification de santé
async fn health_check(State(state): State<SimulatorState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "simulation_active": state.hub.simulation_active(),
        "connected_clients": state.hub.client_count().await,
        "endpoints": {
            "websocket": "/ws",
            "api": "/api/send-message",
            "simulate": "/simulate/*",
        },
        "timestamp": Utc::now(),
    }))
}

/// Exposition Prometheus
async fn get_metrics(State(state): State<SimulatorState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus.render(),
    )
}

/// Statistiques de simulation
async fn get_stats(State(state): State<SimulatorState>) -> Json<Value> {
    Json(json!({
        "simulation_active": state.hub.simulation_active(),
        "connected_clients": state.hub.client_count().await,
        "message_interval": state.message_interval.as_secs_f64(),
        "available_message_types": state.generator.available_kinds(),
        "user_pool_size": state.generator.user_pool_size(),
        "channels": state.generator.channels(),
    }))
}
