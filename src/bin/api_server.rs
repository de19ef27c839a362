// API Server Binary Entry Point
//
// Purpose: Start the Axum API server around the sustainability engine
// Usage: cargo run --features api --bin api_server

use debris_reward_rust::{create_router, AppConfig, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "debris_reward_rust=info,api_server=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    let config = AppConfig::from_env();

    tracing::info!("Configuration:");
    tracing::info!("  DATA_PATH: {:?}", config.data_path);
    tracing::info!("  PORT: {}", config.port);
    tracing::info!("  SOL_PER_KG: {}", config.policy.sol_per_kg);
    tracing::info!("  GEMINI_MODEL: {}", config.gemini_model);
    tracing::info!("  GEO_URL: {}", config.geo_url);
    tracing::info!("  DEFAULT_COUNTRY: {}", config.default_country);

    // Loads the dataset and builds service clients
    tracing::info!("Initializing application state...");
    let state = AppState::new(&config).await?;
    tracing::info!("Application state initialized successfully");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
