//! Waveform generation via the audiowaveform CLI
//!
//! Shells out to `audiowaveform` for per-segment amplitude analysis,
//! parses its JSON output, then resamples the raw series down to the
//! requested number of points, normalized against the peak amplitude.

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;

/// Output of a generation run
#[derive(Debug, Clone)]
pub struct GeneratedWaveform {
    /// Exactly `data_points` samples, each in [0, 1]
    pub waveform_data: Vec<f64>,
    /// Peak raw amplitude; forced to 1.0 when the source peak is 0 so
    /// downstream consumers can divide by it safely
    pub peak_amplitude: f64,
}

/// Seam between the orchestrator and the external analysis tool
#[async_trait]
pub trait WaveformGenerator: Send + Sync {
    async fn generate(&self, audio_path: &str, data_points: usize) -> Result<GeneratedWaveform>;
}

/// audiowaveform JSON document (only the field we read)
#[derive(Debug, Deserialize)]
struct AudiowaveformOutput {
    #[serde(default)]
    data: Vec<f64>,
}

/// Generator backed by the audiowaveform executable
pub struct AudiowaveformGenerator {
    binary: String,
    temp_dir: PathBuf,
    pixels_per_second: u32,
    bits: u32,
}

impl AudiowaveformGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.audiowaveform_binary.clone(),
            temp_dir: config.temp_dir.clone(),
            pixels_per_second: config.pixels_per_second,
            bits: config.bits,
        }
    }

    async fn analyze(
        &self,
        audio_path: &str,
        temp_path: &Path,
        data_points: usize,
    ) -> Result<GeneratedWaveform> {
        let output = Command::new(&self.binary)
            .arg("-i")
            .arg(audio_path)
            .arg("-o")
            .arg(temp_path)
            .arg("--pixels-per-second")
            .arg(self.pixels_per_second.to_string())
            .arg("--bits")
            .arg(self.bits.to_string())
            .output()
            .await
            .map_err(|e| Error::Generation(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Generation(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let json = tokio::fs::read_to_string(temp_path)
            .await
            .map_err(|e| Error::Generation(format!("Read analysis output failed: {}", e)))?;
        let parsed: AudiowaveformOutput = serde_json::from_str(&json)
            .map_err(|e| Error::Generation(format!("Parse analysis output failed: {}", e)))?;

        let peak = parsed.data.iter().cloned().fold(0.0_f64, f64::max);
        let waveform_data = resample_normalized(&parsed.data, data_points, peak);

        Ok(GeneratedWaveform {
            waveform_data,
            // A silent source reports peak 0; return 1.0 so consumers
            // never divide by zero.
            peak_amplitude: if peak > 0.0 { peak } else { 1.0 },
        })
    }
}

#[async_trait]
impl WaveformGenerator for AudiowaveformGenerator {
    async fn generate(&self, audio_path: &str, data_points: usize) -> Result<GeneratedWaveform> {
        if data_points == 0 {
            return Err(Error::InvalidInput(
                "data_points must be a positive integer".to_string(),
            ));
        }

        let temp_path = self.temp_dir.join(format!(
            "waveform-{}-{}.json",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        ));

        let result = self.analyze(audio_path, &temp_path, data_points).await;

        // Remove the intermediate artifact on success and failure alike;
        // cleanup errors are swallowed.
        let _ = tokio::fs::remove_file(&temp_path).await;

        result
    }
}

/// Resample a raw amplitude series to `target_points` buckets and
/// normalize against `peak`, clamping to 1.0.
///
/// Window boundaries come from uniform linear interpolation over the
/// raw length; each bucket emits the arithmetic mean of its window.
/// When `target_points` exceeds the raw length a window can collapse to
/// nothing, in which case the nearest single sample stands in.
pub fn resample_normalized(data: &[f64], target_points: usize, peak: f64) -> Vec<f64> {
    if data.is_empty() || peak <= 0.0 {
        return vec![0.0; target_points];
    }

    let step = data.len() as f64 / target_points as f64;
    let mut result = Vec::with_capacity(target_points);

    for i in 0..target_points {
        let start = ((i as f64) * step).floor() as usize;
        let start = start.min(data.len() - 1);
        let end = (((i + 1) as f64) * step).floor() as usize;
        let end = end.clamp(start + 1, data.len());

        let window = &data[start..end];
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        result.push((mean / peak).min(1.0));
    }

    result
}
