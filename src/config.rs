//! Configuration for trackwave
//!
//! TOML file with environment variable overrides. The config file path
//! comes from `TRACKWAVE_CONFIG` (default `trackwave.toml`); a missing
//! file yields defaults so the service starts with zero setup.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP bind address
    pub bind_address: String,
    /// SQLite database file path
    pub database_path: PathBuf,
    /// audiowaveform executable (name in PATH or absolute path)
    pub audiowaveform_binary: String,
    /// Directory for temporary analysis output files
    pub temp_dir: PathBuf,
    /// Analysis resolution passed to audiowaveform (--pixels-per-second)
    pub pixels_per_second: u32,
    /// Sample bit depth passed to audiowaveform (--bits)
    pub bits: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5740".to_string(),
            database_path: PathBuf::from("trackwave.db"),
            audiowaveform_binary: "audiowaveform".to_string(),
            temp_dir: std::env::temp_dir(),
            pixels_per_second: 20,
            bits: 8,
        }
    }
}

impl Config {
    /// Load configuration: TOML file (if present), then env overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var("TRACKWAVE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("trackwave.toml"));

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Apply `TRACKWAVE_*` environment variable overrides
    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("TRACKWAVE_BIND_ADDRESS") {
            self.bind_address = addr;
        }
        if let Ok(path) = std::env::var("TRACKWAVE_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(bin) = std::env::var("TRACKWAVE_AUDIOWAVEFORM_BINARY") {
            self.audiowaveform_binary = bin;
        }
        if let Ok(dir) = std::env::var("TRACKWAVE_TEMP_DIR") {
            self.temp_dir = PathBuf::from(dir);
        }
        if let Ok(pps) = std::env::var("TRACKWAVE_PIXELS_PER_SECOND") {
            match pps.parse() {
                Ok(n) => self.pixels_per_second = n,
                Err(_) => tracing::warn!("Ignoring invalid TRACKWAVE_PIXELS_PER_SECOND: {}", pps),
            }
        }
        if let Ok(bits) = std::env::var("TRACKWAVE_BITS") {
            match bits.parse() {
                Ok(n) => self.bits = n,
                Err(_) => tracing::warn!("Ignoring invalid TRACKWAVE_BITS: {}", bits),
            }
        }
    }
}
