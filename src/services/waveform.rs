//! Waveform generation orchestrator
//!
//! Owns per-track generation state in the database, drives the
//! generator, and schedules bounded retries with linear backoff when an
//! attempt fails. Retries run as detached tasks; their failures are
//! logged, never surfaced, while the triggering caller always observes
//! the original error.

use crate::db::waveforms::{self, GenerationStatus, WaveformRecord};
use crate::error::{Error, Result};
use crate::services::generator::WaveformGenerator;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Default sample count when no record exists yet
pub const DEFAULT_DATA_POINTS: i64 = 200;

/// Maximum consecutive failed attempts before a track goes terminal
pub const MAX_RETRIES: i64 = 3;

/// Backoff base; attempt n waits n * this
const RETRY_BACKOFF_MS: u64 = 5000;

/// Status projection returned by [`WaveformService::get_status`]
#[derive(Debug, Clone, Serialize)]
pub struct WaveformStatus {
    pub status: GenerationStatus,
    pub retry_count: i64,
}

/// Pure failure transition: terminal once the retry budget is spent,
/// otherwise back to pending for the scheduled retry.
pub fn status_after_failure(retry_count: i64) -> GenerationStatus {
    if retry_count > MAX_RETRIES {
        GenerationStatus::Failed
    } else {
        GenerationStatus::Pending
    }
}

/// Waveform pipeline orchestrator
#[derive(Clone)]
pub struct WaveformService {
    pool: SqlitePool,
    generator: Arc<dyn WaveformGenerator>,
    /// Per-track advisory locks so concurrent attempts for the same
    /// track serialize instead of interleaving upserts and saves.
    track_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
    /// Backoff base for scheduled retries (5s in production)
    retry_backoff: Duration,
}

impl WaveformService {
    pub fn new(pool: SqlitePool, generator: Arc<dyn WaveformGenerator>) -> Self {
        Self {
            pool,
            generator,
            track_locks: Arc::new(Mutex::new(HashMap::new())),
            retry_backoff: Duration::from_millis(RETRY_BACKOFF_MS),
        }
    }

    /// Override the retry backoff base (tests shorten it to exercise
    /// scheduled retries without the 5s wait)
    pub fn with_retry_backoff(mut self, base: Duration) -> Self {
        self.retry_backoff = base;
        self
    }

    async fn track_lock(&self, track_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.track_locks.lock().await;
        locks
            .entry(track_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the map entry once no other attempt holds or awaits it.
    /// Two strong refs means just the map and this caller remain.
    async fn release_track_lock(&self, track_id: Uuid, lock: &Arc<Mutex<()>>) {
        let mut locks = self.track_locks.lock().await;
        if let Some(entry) = locks.get(&track_id) {
            if Arc::ptr_eq(entry, lock) && Arc::strong_count(entry) == 2 {
                locks.remove(&track_id);
            }
        }
    }

    /// Run one generation attempt for a track.
    ///
    /// The row is upserted to `processing` before the external call so
    /// status readers see the attempt immediately. On failure the retry
    /// counter is bumped, a delayed retry is scheduled while budget
    /// remains, and the original error is returned to the caller.
    pub async fn generate_for_track(
        &self,
        track_id: Uuid,
        audio_path: &str,
        data_points: i64,
    ) -> Result<WaveformRecord> {
        if data_points <= 0 {
            return Err(Error::InvalidInput(
                "data_points must be a positive integer".to_string(),
            ));
        }

        let lock = self.track_lock(track_id).await;
        let guard = lock.lock().await;
        let result = self.run_attempt(track_id, audio_path, data_points).await;
        drop(guard);
        self.release_track_lock(track_id, &lock).await;

        result
    }

    /// One attempt, serialized by the caller's per-track lock
    async fn run_attempt(
        &self,
        track_id: Uuid,
        audio_path: &str,
        data_points: i64,
    ) -> Result<WaveformRecord> {
        let started = Instant::now();

        waveforms::upsert_processing(&self.pool, track_id, data_points).await?;
        let mut record = waveforms::load_by_track_id(&self.pool, track_id)
            .await?
            .ok_or_else(|| {
                Error::Internal(format!("Waveform row missing after upsert for {}", track_id))
            })?;

        match self
            .generator
            .generate(audio_path, data_points as usize)
            .await
        {
            Ok(generated) => {
                record.waveform_data = generated.waveform_data;
                record.peak_amplitude = generated.peak_amplitude;
                record.generation_status = GenerationStatus::Completed;
                record.processing_duration_ms = Some(started.elapsed().as_millis() as i64);
                record.retry_count = 0;

                waveforms::save(&self.pool, &mut record).await?;

                info!(
                    %track_id,
                    duration_ms = record.processing_duration_ms,
                    "Waveform generation completed"
                );
                Ok(record)
            }
            Err(err) => {
                warn!(%track_id, %err, "Waveform generation failed");

                record.retry_count += 1;
                record.generation_status = status_after_failure(record.retry_count);
                waveforms::save(&self.pool, &mut record).await?;

                if record.generation_status != GenerationStatus::Failed {
                    self.schedule_retry(track_id, audio_path, data_points, record.retry_count);
                }

                Err(err)
            }
        }
    }

    /// Schedule a detached retry after `retry_count * 5s`.
    ///
    /// Fire-and-forget: the retry's own failure is only logged, and
    /// nothing cancels it short of process exit.
    // TODO: replace with a durable job queue so retries survive restarts
    fn schedule_retry(&self, track_id: Uuid, audio_path: &str, data_points: i64, retry_count: i64) {
        let service = self.clone();
        let audio_path = audio_path.to_string();
        let delay = self.retry_backoff * retry_count as u32;

        info!(%track_id, retry_count, delay_ms = delay.as_millis() as u64, "Scheduling waveform retry");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = service
                .generate_for_track(track_id, &audio_path, data_points)
                .await
            {
                error!(%track_id, retry_count, %err, "Waveform retry failed");
            }
        });
    }

    /// Full record, or NotFound
    pub async fn get_by_track_id(&self, track_id: Uuid) -> Result<WaveformRecord> {
        waveforms::load_by_track_id(&self.pool, track_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Waveform not found for track {}", track_id)))
    }

    /// Status and retry count, or NotFound
    pub async fn get_status(&self, track_id: Uuid) -> Result<WaveformStatus> {
        let (status, retry_count) = waveforms::load_status(&self.pool, track_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Waveform not found for track {}", track_id)))?;

        Ok(WaveformStatus {
            status,
            retry_count,
        })
    }

    /// Explicit regeneration: clears the retry counter first, then runs
    /// a fresh attempt with the record's existing data_points (200 when
    /// no record exists yet).
    pub async fn regenerate(&self, track_id: Uuid, audio_path: &str) -> Result<WaveformRecord> {
        let data_points = match waveforms::load_by_track_id(&self.pool, track_id).await? {
            Some(record) => {
                waveforms::reset_retry_count(&self.pool, track_id).await?;
                record.data_points
            }
            None => DEFAULT_DATA_POINTS,
        };

        self.generate_for_track(track_id, audio_path, data_points)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generator::GeneratedWaveform;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn failure_transition_respects_retry_budget() {
        assert_eq!(status_after_failure(1), GenerationStatus::Pending);
        assert_eq!(status_after_failure(2), GenerationStatus::Pending);
        assert_eq!(status_after_failure(3), GenerationStatus::Pending);
        assert_eq!(status_after_failure(4), GenerationStatus::Failed);
        assert_eq!(status_after_failure(100), GenerationStatus::Failed);
    }

    struct StubGenerator;

    #[async_trait]
    impl WaveformGenerator for StubGenerator {
        async fn generate(
            &self,
            _audio_path: &str,
            data_points: usize,
        ) -> Result<GeneratedWaveform> {
            Ok(GeneratedWaveform {
                waveform_data: vec![0.25; data_points],
                peak_amplitude: 1.0,
            })
        }
    }

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn track_lock_entry_is_evicted_after_attempt() {
        let pool = memory_pool().await;
        let service = WaveformService::new(pool, Arc::new(StubGenerator));
        let track_id = Uuid::new_v4();

        service
            .generate_for_track(track_id, "/music/a.mp3", 10)
            .await
            .unwrap();

        assert!(service.track_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn lock_map_does_not_accumulate_across_tracks() {
        let pool = memory_pool().await;
        let service = WaveformService::new(pool, Arc::new(StubGenerator));

        for _ in 0..20 {
            service
                .generate_for_track(Uuid::new_v4(), "/music/a.mp3", 4)
                .await
                .unwrap();
        }

        assert!(service.track_locks.lock().await.is_empty());
    }
}
