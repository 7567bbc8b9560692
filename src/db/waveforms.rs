//! Waveform record persistence
//!
//! One row per track, keyed on `track_id`. The orchestrator upserts the
//! row to `processing` before the slow external call so that status
//! readers never observe stale completed/failed state mid-attempt.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Generation lifecycle of a waveform row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// Initial state, or failed attempt with retries remaining
    Pending,
    /// A generation attempt is in flight
    Processing,
    /// Waveform data is available
    Completed,
    /// Retry budget exhausted
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(GenerationStatus::Pending),
            "processing" => Ok(GenerationStatus::Processing),
            "completed" => Ok(GenerationStatus::Completed),
            "failed" => Ok(GenerationStatus::Failed),
            other => Err(Error::Internal(format!(
                "Unknown generation status in database: {}",
                other
            ))),
        }
    }
}

/// Persisted waveform summary for a track
#[derive(Debug, Clone, Serialize)]
pub struct WaveformRecord {
    pub track_id: Uuid,
    /// Normalized amplitude samples in [0, 1]; length == data_points
    /// whenever generation_status is completed
    pub waveform_data: Vec<f64>,
    pub data_points: i64,
    /// Normalization divisor observed during analysis
    pub peak_amplitude: f64,
    pub generation_status: GenerationStatus,
    /// Wall-clock duration of the last successful attempt
    pub processing_duration_ms: Option<i64>,
    /// Consecutive failed attempts since the last success or reset
    pub retry_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert the row to `processing` before a generation attempt.
///
/// On conflict only data_points, status, and updated_at change;
/// retry_count and any prior waveform data survive until the attempt
/// resolves.
pub async fn upsert_processing(pool: &SqlitePool, track_id: Uuid, data_points: i64) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO track_waveforms
            (track_id, waveform_data, data_points, peak_amplitude,
             generation_status, retry_count, created_at, updated_at)
        VALUES (?, '[]', ?, 0.0, 'processing', 0, ?, ?)
        ON CONFLICT(track_id) DO UPDATE SET
            data_points = excluded.data_points,
            generation_status = 'processing',
            updated_at = excluded.updated_at
        "#,
    )
    .bind(track_id.to_string())
    .bind(data_points)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load waveform record by track id
pub async fn load_by_track_id(pool: &SqlitePool, track_id: Uuid) -> Result<Option<WaveformRecord>> {
    let row = sqlx::query(
        r#"
        SELECT track_id, waveform_data, data_points, peak_amplitude,
               generation_status, processing_duration_ms, retry_count,
               created_at, updated_at
        FROM track_waveforms
        WHERE track_id = ?
        "#,
    )
    .bind(track_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(record_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Load only status and retry count (projection for status polling)
pub async fn load_status(
    pool: &SqlitePool,
    track_id: Uuid,
) -> Result<Option<(GenerationStatus, i64)>> {
    let row = sqlx::query(
        r#"
        SELECT generation_status, retry_count
        FROM track_waveforms
        WHERE track_id = ?
        "#,
    )
    .bind(track_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let status_str: String = row.get("generation_status");
            let status = GenerationStatus::parse(&status_str)?;
            let retry_count: i64 = row.get("retry_count");
            Ok(Some((status, retry_count)))
        }
        None => Ok(None),
    }
}

/// Save the mutable attempt fields of an existing record.
///
/// Sets `updated_at` on the record so the returned value matches the
/// persisted row.
pub async fn save(pool: &SqlitePool, record: &mut WaveformRecord) -> Result<()> {
    record.updated_at = Utc::now();

    let data_json = serde_json::to_string(&record.waveform_data)
        .map_err(|e| Error::Internal(format!("Serialize waveform data failed: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE track_waveforms
        SET waveform_data = ?,
            data_points = ?,
            peak_amplitude = ?,
            generation_status = ?,
            processing_duration_ms = ?,
            retry_count = ?,
            updated_at = ?
        WHERE track_id = ?
        "#,
    )
    .bind(&data_json)
    .bind(record.data_points)
    .bind(record.peak_amplitude)
    .bind(record.generation_status.as_str())
    .bind(record.processing_duration_ms)
    .bind(record.retry_count)
    .bind(record.updated_at.to_rfc3339())
    .bind(record.track_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Reset the retry counter ahead of an explicit regeneration
pub async fn reset_retry_count(pool: &SqlitePool, track_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE track_waveforms
        SET retry_count = 0, updated_at = ?
        WHERE track_id = ?
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .bind(track_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

fn record_from_row(row: &SqliteRow) -> Result<WaveformRecord> {
    let track_id_str: String = row.get("track_id");
    let track_id = Uuid::parse_str(&track_id_str)
        .map_err(|e| Error::Internal(format!("Invalid track id in database: {}", e)))?;

    let data_json: String = row.get("waveform_data");
    let waveform_data: Vec<f64> = serde_json::from_str(&data_json)
        .map_err(|e| Error::Internal(format!("Parse waveform data failed: {}", e)))?;

    let status_str: String = row.get("generation_status");
    let generation_status = GenerationStatus::parse(&status_str)?;

    Ok(WaveformRecord {
        track_id,
        waveform_data,
        data_points: row.get("data_points"),
        peak_amplitude: row.get("peak_amplitude"),
        generation_status,
        processing_duration_ms: row.get("processing_duration_ms"),
        retry_count: row.get("retry_count"),
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.get(column);
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid {} timestamp: {}", column, e)))
}
