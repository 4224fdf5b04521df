//! Recipe search API server.

use anyhow::Result;
use clap::Parser;
use recipe_finder::config::AppConfig;
use recipe_finder::search::SearchService;
use recipe_finder::server::{serve, ImageProxy, ServerState};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "HTTP API for natural-language recipe search")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    if !config.db_path.exists() {
        warn!(
            db = %config.db_path.display(),
            "Recipe database not found; searches will fail until `recipe-finder init-db` runs"
        );
    }

    let search = SearchService::from_config(&config)?;
    let state = Arc::new(ServerState::new(
        search,
        ImageProxy::new()?,
        config.frontend_dir.clone(),
    ));

    info!(
        addr = %args.addr,
        db = %config.db_path.display(),
        frontend = %config.frontend_dir.display(),
        "Starting recipe search server"
    );
    serve(&args.addr, state).await?;
    Ok(())
}
