//! Serveur MCP — rendu de prompts et dispatch vers le backend LLM

use clap::Parser;
use moderation_server::config::{CliArgs, LlmConfig, McpSettings};
use moderation_server::mcp::routes::{self, McpState};
use moderation_server::mcp::McpServer;
use moderation_server::{init_tracing, metrics};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    init_tracing("mcp-server", args.is_production());

    info!("🚀 Démarrage du serveur MCP...");

    let prometheus = metrics::install_recorder()?;
    metrics::describe_mcp_metrics();

    let server = Arc::new(McpServer::new(
        McpSettings::from_env(),
        LlmConfig::from_env()?,
    )?);

    let app = routes::router(McpState { server, prometheus });

    let bind_addr = args.resolve_bind_addr(8000);
    let listener = TcpListener::bind(bind_addr).await?;

    info!("✅ Serveur MCP démarré sur http://{}", bind_addr);
    info!("📊 Endpoints disponibles:");
    info!("   - POST /moderate    - Modération d'un message via LLM");
    info!("   - GET  /templates   - Templates de prompts disponibles");
    info!("   - GET  /health /metrics");

    axum::serve(listener, app).await?;
    Ok(())
}
