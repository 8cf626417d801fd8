//! Moteur de décision — politique, escalade et exécution d'actions

use clap::Parser;
use moderation_server::config::{CliArgs, DatabaseConfig, NotifierConfig};
use moderation_server::decision::actions::ActionExecutor;
use moderation_server::decision::routes::{self, DecisionState};
use moderation_server::decision::store::DecisionStore;
use moderation_server::notifier::Notifier;
use moderation_server::{init_tracing, metrics};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    init_tracing("decision-handler", args.is_production());

    info!("🚀 Démarrage du moteur de décision...");

    let prometheus = metrics::install_recorder()?;
    metrics::describe_decision_metrics();

    let database = DatabaseConfig::from_env()?;
    let store = Arc::new(DecisionStore::connect(&database.url, database.max_connections).await?);
    let executor = Arc::new(ActionExecutor::new(Notifier::new(NotifierConfig::from_env()?)));

    let app = routes::router(DecisionState { store, executor, prometheus });

    let bind_addr = args.resolve_bind_addr(8003);
    let listener = TcpListener::bind(bind_addr).await?;

    info!("✅ Moteur de décision démarré sur http://{}", bind_addr);
    info!("📊 Endpoints disponibles:");
    info!("   - POST /process                 - Application de la politique");
    info!("   - GET  /user/:id/history        - Instantané des violations");
    info!("   - GET  /health /metrics");

    axum::serve(listener, app).await?;
    Ok(())
}
