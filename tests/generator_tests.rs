//! AudiowaveformGenerator integration tests
//!
//! Drive the real generator against a stub executable standing in for
//! audiowaveform, covering output parsing, error surfacing, and the
//! removal of the intermediate artifact on success and failure alike.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trackwave::config::Config;
use trackwave::error::Error;
use trackwave::services::{AudiowaveformGenerator, WaveformGenerator};

/// Write an executable shell script standing in for audiowaveform.
///
/// The generator invokes `<binary> -i <audio> -o <out> ...`, so the
/// stub's `$4` is the output path.
fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn generator_with(stub: &Path, temp_dir: &Path) -> AudiowaveformGenerator {
    let mut config = Config::default();
    config.audiowaveform_binary = stub.to_string_lossy().into_owned();
    config.temp_dir = temp_dir.to_path_buf();
    AudiowaveformGenerator::new(&config)
}

fn temp_artifact_count(temp_dir: &Path) -> usize {
    fs::read_dir(temp_dir).unwrap().count()
}

#[tokio::test]
async fn stub_analysis_produces_normalized_output_and_cleans_up() {
    let stub_dir = TempDir::new().unwrap();
    let temp_dir = TempDir::new().unwrap();

    let stub = write_stub(
        stub_dir.path(),
        "audiowaveform-ok",
        "#!/bin/sh\nprintf '{\"data\":[0,2,4,6,8,10,12,14]}' > \"$4\"\n",
    );
    let generator = generator_with(&stub, temp_dir.path());

    let result = generator.generate("/music/song.mp3", 4).await.unwrap();

    assert_eq!(result.waveform_data.len(), 4);
    assert!((result.peak_amplitude - 14.0).abs() < 1e-9);
    assert!((result.waveform_data[0] - 1.0 / 14.0).abs() < 1e-9);
    assert!((result.waveform_data[3] - 13.0 / 14.0).abs() < 1e-9);

    assert_eq!(temp_artifact_count(temp_dir.path()), 0);
}

#[tokio::test]
async fn silent_source_yields_zeros_with_safe_peak() {
    let stub_dir = TempDir::new().unwrap();
    let temp_dir = TempDir::new().unwrap();

    let stub = write_stub(
        stub_dir.path(),
        "audiowaveform-silent",
        "#!/bin/sh\nprintf '{\"data\":[0,0,0,0]}' > \"$4\"\n",
    );
    let generator = generator_with(&stub, temp_dir.path());

    let result = generator.generate("/music/silence.mp3", 8).await.unwrap();

    assert_eq!(result.waveform_data, vec![0.0; 8]);
    assert!((result.peak_amplitude - 1.0).abs() < 1e-9);
    assert_eq!(temp_artifact_count(temp_dir.path()), 0);
}

#[tokio::test]
async fn failing_process_surfaces_generation_error_and_cleans_up() {
    let stub_dir = TempDir::new().unwrap();
    let temp_dir = TempDir::new().unwrap();

    // Writes its output, then exits non-zero anyway; the artifact must
    // still be removed
    let stub = write_stub(
        stub_dir.path(),
        "audiowaveform-fail",
        "#!/bin/sh\nprintf '{\"data\":[1]}' > \"$4\"\necho 'decode error' >&2\nexit 1\n",
    );
    let generator = generator_with(&stub, temp_dir.path());

    let result = generator.generate("/music/song.mp3", 4).await;

    assert!(matches!(result, Err(Error::Generation(_))));
    assert_eq!(temp_artifact_count(temp_dir.path()), 0);
}

#[tokio::test]
async fn unparseable_output_is_a_generation_error() {
    let stub_dir = TempDir::new().unwrap();
    let temp_dir = TempDir::new().unwrap();

    let stub = write_stub(
        stub_dir.path(),
        "audiowaveform-garbage",
        "#!/bin/sh\nprintf 'not json' > \"$4\"\n",
    );
    let generator = generator_with(&stub, temp_dir.path());

    let result = generator.generate("/music/song.mp3", 4).await;

    assert!(matches!(result, Err(Error::Generation(_))));
    assert_eq!(temp_artifact_count(temp_dir.path()), 0);
}

#[tokio::test]
async fn missing_binary_is_a_generation_error() {
    let temp_dir = TempDir::new().unwrap();

    let mut config = Config::default();
    config.audiowaveform_binary = "/nonexistent/audiowaveform".to_string();
    config.temp_dir = temp_dir.path().to_path_buf();
    let generator = AudiowaveformGenerator::new(&config);

    let result = generator.generate("/music/song.mp3", 4).await;
    assert!(matches!(result, Err(Error::Generation(_))));
}
