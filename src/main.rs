//! Gatehouse - session-brokering gateway for the plate-recognition API

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse::{server, AppState, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gatehouse={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Gatehouse - plate gateway");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Upstream API: {}", args.upstream_url);
    info!("Session TTL: {}s", args.session_ttl_seconds);
    info!(
        "Timeouts: connect {}ms, request {}ms",
        args.connect_timeout_ms, args.request_timeout_ms
    );
    info!("======================================");

    let state = Arc::new(AppState::new(args)?);

    server::run(state).await?;

    Ok(())
}
