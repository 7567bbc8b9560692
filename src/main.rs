//! trackwave - audio waveform generation microservice

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trackwave::config::Config;
use trackwave::services::{AudiowaveformGenerator, WaveformService};
use trackwave::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting trackwave waveform service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("Database: {}", config.database_path.display());

    let db_pool = trackwave::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let generator = Arc::new(AudiowaveformGenerator::new(&config));
    let service = WaveformService::new(db_pool.clone(), generator);

    let state = AppState::new(db_pool, service);
    let app = trackwave::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
