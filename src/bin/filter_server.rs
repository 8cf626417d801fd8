//! Filtre léger — pré-classification rapide des messages de chat

use clap::Parser;
use moderation_server::config::{CliArgs, FilterSettings};
use moderation_server::filter::routes::{self, FilterState};
use moderation_server::filter::LightweightFilter;
use moderation_server::{init_tracing, metrics};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    init_tracing("filter-server", args.is_production());

    info!("🚀 Démarrage du filtre léger...");

    let prometheus = metrics::install_recorder()?;
    metrics::describe_filter_metrics();

    let filter = Arc::new(LightweightFilter::from_settings(FilterSettings::from_env())?);

    // Purge périodique des buckets de rate limiting inactifs
    let cleanup_filter = Arc::clone(&filter);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            cleanup_filter.cleanup_rate_limit_buckets();
        }
    });

    let app = routes::router(FilterState { filter, prometheus });

    let bind_addr = args.resolve_bind_addr(8001);
    let listener = TcpListener::bind(bind_addr).await?;

    info!("✅ Filtre démarré sur http://{}", bind_addr);
    info!("📊 Endpoints disponibles:");
    info!("   - POST /filter                  - Pré-classification d'un message");
    info!("   - GET  /config                  - Configuration courante");
    info!("   - POST /config/toggle/:name     - Bascule d'un sous-filtre");
    info!("   - GET  /health /metrics /stats");

    axum::serve(listener, app).await?;
    Ok(())
}
