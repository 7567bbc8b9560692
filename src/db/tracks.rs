//! Track lookup
//!
//! Resolves a track id to its audio source so regeneration can be
//! initiated. Track CRUD beyond that belongs to the upstream catalog
//! service; this table mirrors only the columns trackwave reads.

use crate::error::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Minimal track projection used by the waveform pipeline
#[derive(Debug, Clone)]
pub struct TrackRef {
    pub id: Uuid,
    pub title: String,
    /// Local filename or remote URL; None when no audio has been attached
    pub audio_url: Option<String>,
}

/// Load a track by id
pub async fn load_track(pool: &SqlitePool, track_id: Uuid) -> Result<Option<TrackRef>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, audio_url
        FROM tracks
        WHERE id = ?
        "#,
    )
    .bind(track_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(TrackRef {
            id: track_id,
            title: row.get("title"),
            audio_url: row.get("audio_url"),
        })),
        None => Ok(None),
    }
}

/// Insert or update a track row
pub async fn save_track(
    pool: &SqlitePool,
    track_id: Uuid,
    title: &str,
    artist_name: &str,
    audio_url: Option<&str>,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO tracks (id, title, artist_name, audio_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            artist_name = excluded.artist_name,
            audio_url = excluded.audio_url,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(track_id.to_string())
    .bind(title)
    .bind(artist_name)
    .bind(audio_url)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}
