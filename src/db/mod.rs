//! Database access for trackwave
//!
//! SQLite via sqlx. One table per concern: `tracks` (audio source
//! lookup) and `track_waveforms` (generation state, one row per track).

pub mod tracks;
pub mod waveforms;

use crate::error::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist_name TEXT NOT NULL DEFAULT '',
            audio_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One waveform row per track, keyed on track_id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS track_waveforms (
            track_id TEXT PRIMARY KEY,
            waveform_data TEXT NOT NULL DEFAULT '[]',
            data_points INTEGER NOT NULL DEFAULT 200,
            peak_amplitude REAL NOT NULL DEFAULT 0.0,
            generation_status TEXT NOT NULL DEFAULT 'pending',
            processing_duration_ms INTEGER,
            retry_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (tracks, track_waveforms)");

    Ok(())
}
