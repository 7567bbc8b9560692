//! Service layer: generation pipeline and its orchestration

pub mod generator;
pub mod waveform;

pub use generator::{AudiowaveformGenerator, GeneratedWaveform, WaveformGenerator};
pub use waveform::{WaveformService, WaveformStatus};
