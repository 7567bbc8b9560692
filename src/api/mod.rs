//! HTTP API for trackwave

pub mod health;
pub mod waveform;

pub use health::health_routes;
pub use waveform::waveform_routes;
