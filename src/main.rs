//! Ingress / simulateur de chat
//!
//! Accepte des messages (WebSocket, REST, générateur synthétique), les
//! fait traverser le pipeline filtre → MCP → décision et diffuse chaque
//! résultat aux abonnés WebSocket.

use clap::Parser;
use moderation_server::config::{CliArgs, PipelineConfig};
use moderation_server::simulator::generator::MessageGenerator;
use moderation_server::simulator::hub::ChatHub;
use moderation_server::simulator::pipeline::PipelineClient;
use moderation_server::simulator::{routes, SimulatorState};
use moderation_server::{init_tracing, metrics};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    init_tracing("chat-simulator", args.is_production());

    info!("🚀 Démarrage du simulateur de chat...");

    let prometheus = metrics::install_recorder()?;
    metrics::describe_simulator_metrics();

    let config = PipelineConfig::from_env()?;
    let message_interval = config.message_interval;

    let sample_path =
        std::env::var("SAMPLE_DATA_PATH").unwrap_or_else(|_| "config/sample_messages.json".into());

    let state = SimulatorState {
        hub: Arc::new(ChatHub::new()),
        generator: Arc::new(MessageGenerator::load(&sample_path)),
        pipeline: Arc::new(PipelineClient::new(config)?),
        prometheus,
        message_interval,
    };

    let app = routes::router(state);

    let bind_addr = args.resolve_bind_addr(8002);
    let listener = TcpListener::bind(bind_addr).await?;

    info!("✅ Simulateur démarré sur http://{}", bind_addr);
    info!("📊 Endpoints disponibles:");
    info!("   - GET  /ws                  - Flux WebSocket temps réel");
    info!("   - POST /api/send-message    - Ingestion d'un message utilisateur");
    info!("   - POST /simulate/single     - Un message synthétique");
    info!("   - POST /simulate/start      - Démarrage du générateur");
    info!("   - POST /simulate/stop       - Arrêt du générateur");
    info!("   - GET  /health /metrics /api/stats");

    axum::serve(listener, app).await?;
    Ok(())
}
