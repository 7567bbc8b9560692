//! Shared test utilities: temp database and a scriptable generator

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use trackwave::error::{Error, Result};
use trackwave::services::{GeneratedWaveform, WaveformGenerator, WaveformService};
use trackwave::AppState;

/// Create a temporary test database with tables applied.
///
/// The TempDir must be kept alive for the duration of the test.
pub async fn create_test_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let db_path = temp_dir.path().join("trackwave_test.db");
    let pool = trackwave::db::init_database_pool(&db_path)
        .await
        .expect("init test database");
    (temp_dir, pool)
}

/// Generator stand-in with scriptable success/failure
pub struct MockGenerator {
    fail: bool,
    pub calls: AtomicUsize,
}

impl MockGenerator {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl WaveformGenerator for MockGenerator {
    async fn generate(&self, _audio_path: &str, data_points: usize) -> Result<GeneratedWaveform> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(Error::Generation("analysis process exited with 1".to_string()));
        }

        Ok(GeneratedWaveform {
            waveform_data: vec![0.5; data_points],
            peak_amplitude: 0.95,
        })
    }
}

/// Build an AppState over a temp database and the given generator
pub async fn test_app_state(generator: Arc<MockGenerator>) -> (TempDir, AppState) {
    let (temp_dir, pool) = create_test_pool().await;
    let service = WaveformService::new(pool.clone(), generator);
    (temp_dir, AppState::new(pool, service))
}
