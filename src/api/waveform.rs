//! Waveform API handlers
//!
//! GET  /api/waveform/:track_id          → full record
//! GET  /api/waveform/:track_id/status   → { status, retry_count }
//! POST /api/waveform/:track_id/regenerate → acknowledgement

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::db::tracks;
use crate::db::waveforms::WaveformRecord;
use crate::error::{ApiError, ApiResult};
use crate::services::WaveformStatus;
use crate::AppState;

/// GET /api/waveform/:track_id
pub async fn get_waveform(
    State(state): State<AppState>,
    Path(track_id): Path<Uuid>,
) -> ApiResult<Json<WaveformRecord>> {
    let record = state.waveforms.get_by_track_id(track_id).await?;
    Ok(Json(record))
}

/// GET /api/waveform/:track_id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(track_id): Path<Uuid>,
) -> ApiResult<Json<WaveformStatus>> {
    let status = state.waveforms.get_status(track_id).await?;
    Ok(Json(status))
}

/// Acknowledgement body for regeneration requests
#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub message: String,
}

/// POST /api/waveform/:track_id/regenerate
///
/// Resolves the track's audio source, then runs the pipeline detached;
/// the caller only learns whether regeneration could be initiated.
/// Generation failures are handled by the orchestrator's own retry
/// logic and logged by the detached task.
pub async fn regenerate(
    State(state): State<AppState>,
    Path(track_id): Path<Uuid>,
) -> ApiResult<Json<RegenerateResponse>> {
    let track = tracks::load_track(&state.db, track_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Track {} not found", track_id)))?;

    let audio_url = track.audio_url.ok_or_else(|| {
        ApiError::Internal(format!("Track {} has no resolvable audio source", track_id))
    })?;

    tracing::info!(%track_id, track = %track.title, "Waveform regeneration requested");

    let service = state.waveforms.clone();
    tokio::spawn(async move {
        if let Err(err) = service.regenerate(track_id, &audio_url).await {
            tracing::error!(%track_id, %err, "Waveform regeneration failed");
        }
    });

    Ok(Json(RegenerateResponse {
        message: format!("Waveform regeneration started for track {}", track_id),
    }))
}

/// Build waveform routes
pub fn waveform_routes() -> Router<AppState> {
    Router::new()
        .route("/api/waveform/:track_id", get(get_waveform))
        .route("/api/waveform/:track_id/status", get(get_status))
        .route("/api/waveform/:track_id/regenerate", post(regenerate))
}
