//! # Ingress / simulateur de chat
//!
//! Point d'entrée du pipeline: accepte des messages (WebSocket, REST ou
//! générateur synthétique), orchestre filtre → MCP → décision et diffuse
//! chaque résultat à tous les abonnés WebSocket.

pub mod generator;
pub mod hub;
pub mod pipeline;
pub mod routes;

use generator::MessageGenerator;
use hub::ChatHub;
use metrics_exporter_prometheus::PrometheusHandle;
use pipeline::PipelineClient;
use std::sync::Arc;
use std::time::Duration;

/// État partagé de l'ingress
#[derive(Clone)]
pub struct SimulatorState {
    pub hub: Arc<ChatHub>,
    pub generator: Arc<MessageGenerator>,
    pub pipeline: Arc<PipelineClient>,
    pub prometheus: PrometheusHandle,
    pub message_interval: Duration,
}

/// Boucle principale de simulation: génère, traite, diffuse, attend.
/// S'arrête quand le drapeau du hub repasse à faux.
pub async fn simulate_chat_stream(state: SimulatorState) {
    tracing::info!(
        interval_s = state.message_interval.as_secs_f64(),
        "🚀 Démarrage de la simulation de chat"
    );

    while state.hub.simulation_active() {
        let message = state.generator.generate(None);
        let result = pipeline::process_message(&state.pipeline, message).await;

        state.hub.broadcast(&pipeline::broadcast_payload(&result)).await;

        tokio::time::sleep(state.message_interval).await;
    }

    tracing::info!("🛑 Boucle de simulation terminée");
}
