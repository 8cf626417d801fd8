//! Évaluateur de métriques — supervision et rapports du pipeline

use clap::Parser;
use moderation_server::config::{CliArgs, DatabaseConfig, EvaluatorConfig};
use moderation_server::evaluator::routes::{self, EvaluatorState};
use moderation_server::evaluator::MetricsEvaluator;
use moderation_server::{init_tracing, metrics};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    init_tracing("metrics-evaluator", args.is_production());

    info!("🚀 Démarrage de l'évaluateur de métriques...");

    let prometheus = metrics::install_recorder()?;
    metrics::describe_evaluator_metrics();

    let database = DatabaseConfig::from_env()?;
    let evaluator = Arc::new(
        MetricsEvaluator::connect(
            &database.url,
            database.max_connections,
            EvaluatorConfig::from_env()?,
        )
        .await?,
    );

    let app = routes::router(EvaluatorState { evaluator, prometheus });

    let bind_addr = args.resolve_bind_addr(8004);
    let listener = TcpListener::bind(bind_addr).await?;

    info!("✅ Évaluateur démarré sur http://{}", bind_addr);
    info!("📊 Endpoints disponibles:");
    info!("   - GET  /metrics/system       - Instantané des métriques");
    info!("   - GET  /metrics/accuracy     - Rapport de précision");
    info!("   - GET  /metrics/performance  - Rapport de performance");
    info!("   - GET  /health/system        - Santé avec alertes");
    info!("   - GET  /health /metrics");

    axum::serve(listener, app).await?;
    Ok(())
}
