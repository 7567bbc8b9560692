//! trackwave - audio waveform generation service
//!
//! Owns per-track waveform summaries: shells out to the audiowaveform
//! CLI, resamples and normalizes its output, persists generation state
//! in SQLite, and retries failed generations with linear backoff.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult, Error, Result};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::services::WaveformService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Waveform pipeline orchestrator
    pub waveforms: WaveformService,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, waveforms: WaveformService) -> Self {
        Self {
            db,
            waveforms,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::waveform_routes())
        .merge(api::health_routes())
        .with_state(state)
}
