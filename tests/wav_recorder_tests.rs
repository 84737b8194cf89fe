// Integration tests for the WAV recorder
//
// These run the synthetic backend on a paused clock and check the artifacts the
// recorder leaves on disk.

use anyhow::Result;
use capture_session::{
    AudioBackend, AudioBackendConfig, AudioFrame, IntervalScheduler, OutputProfile, ProfileTable,
    Recorder, RecorderError, SessionController, SessionEvent, SessionStore, SyntheticBackend,
    WavRecorder,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::sleep;

fn wav_recorder(dir: &Path, backend: SyntheticBackend) -> WavRecorder {
    WavRecorder::new(Box::new(backend), dir.to_path_buf(), ProfileTable::default())
}

/// Device that delivers a single frame with a dangling sample, then goes quiet
///
/// Against a stereo profile the frame leaves half a sample pair, so the WAV
/// writer cannot finalize.
#[derive(Default)]
struct TruncatedBackend {
    capturing: bool,
}

#[async_trait::async_trait]
impl AudioBackend for TruncatedBackend {
    async fn start(&mut self, config: AudioBackendConfig) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(1);
        tx.send(AudioFrame {
            samples: vec![100, -100, 100],
            sample_rate: config.sample_rate,
            channels: config.channels,
            timestamp_ms: 0,
        })
        .await?;
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "truncated"
    }
}

fn stereo_wideband() -> ProfileTable {
    let mut profiles = ProfileTable::default();
    profiles.wideband.channels = 2;
    profiles
}

fn truncating_recorder(dir: &Path) -> WavRecorder {
    WavRecorder::new(
        Box::new(TruncatedBackend::default()),
        dir.to_path_buf(),
        stereo_wideband(),
    )
}

fn artifact_count(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    Ok(fs::read_dir(dir)?.count())
}

#[tokio::test(start_paused = true)]
async fn test_stop_produces_readable_wav() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = wav_recorder(temp_dir.path(), SyntheticBackend::default());

    recorder.start(OutputProfile::Narrowband).await?;
    assert!(recorder.is_recording());

    sleep(Duration::from_millis(1050)).await;
    assert!(recorder.amplitude() > 0, "Tone should produce a non-zero level");

    let path = recorder.stop().await?;
    assert!(!recorder.is_recording());
    assert_eq!(recorder.amplitude(), 0);
    assert!(path.starts_with(temp_dir.path()));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("wav"));

    let reader = hound::WavReader::open(&path)?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    // Frames are 100ms of audio each
    let samples = reader.len() as usize;
    assert!(samples > 0, "Recording should not be empty");
    assert_eq!(samples % 800, 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_wideband_uses_profile_sample_rate() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = wav_recorder(temp_dir.path(), SyntheticBackend::default());

    recorder.start(OutputProfile::Wideband).await?;
    sleep(Duration::from_millis(250)).await;
    let path = recorder.stop().await?;

    let reader = hound::WavReader::open(&path)?;
    assert_eq!(reader.spec().sample_rate, 32000);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_bit_rate_does_not_change_pcm_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut profiles = ProfileTable::default();
    profiles.narrowband.bit_rate = 4750;
    let mut recorder = WavRecorder::new(
        Box::new(SyntheticBackend::default()),
        temp_dir.path().to_path_buf(),
        profiles,
    );

    recorder.start(OutputProfile::Narrowband).await?;
    sleep(Duration::from_millis(250)).await;
    let path = recorder.stop().await?;

    let spec = hound::WavReader::open(&path)?.spec();
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.bits_per_sample, 16);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_discards_artifact() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = wav_recorder(temp_dir.path(), SyntheticBackend::default());

    recorder.start(OutputProfile::Narrowband).await?;
    sleep(Duration::from_millis(500)).await;
    assert_eq!(artifact_count(temp_dir.path())?, 1);

    recorder.cancel().await?;

    assert!(!recorder.is_recording());
    assert_eq!(artifact_count(temp_dir.path())?, 0, "Cancel should delete the temp file");

    Ok(())
}

#[tokio::test]
async fn test_idle_cancel_and_stop() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = wav_recorder(temp_dir.path(), SyntheticBackend::default());

    recorder.cancel().await?;
    assert!(matches!(recorder.stop().await, Err(RecorderError::NotRecording)));
    assert_eq!(recorder.amplitude(), 0);

    Ok(())
}

#[tokio::test]
async fn test_failed_finalize_discards_artifact() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = truncating_recorder(temp_dir.path());

    recorder.start(OutputProfile::Wideband).await?;
    assert_eq!(artifact_count(temp_dir.path())?, 1);

    let result = recorder.stop().await;

    assert!(matches!(result, Err(RecorderError::Encoding(_))));
    assert!(!recorder.is_recording());
    assert_eq!(artifact_count(temp_dir.path())?, 0, "Unfinalized file should be removed");

    // The recorder is reusable after the failure
    recorder.start(OutputProfile::Wideband).await?;
    recorder.cancel().await?;
    assert_eq!(artifact_count(temp_dir.path())?, 0);

    Ok(())
}

#[tokio::test]
async fn test_controller_recovers_from_failed_finalize() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (facade, handle) = SessionController::new(
        Box::new(truncating_recorder(temp_dir.path())),
        Arc::new(IntervalScheduler::new()),
        Arc::new(SessionStore::new()),
    )
    .spawn();
    let mut events = facade.events();

    facade.start("broken", OutputProfile::Wideband);
    facade
        .observe()
        .wait_for(|s| s.as_ref().is_some_and(|s| s.session_id == "broken"))
        .await?;

    facade.stop();
    match events.recv().await? {
        SessionEvent::StorageFailed { path, .. } => assert_eq!(path, None),
        other => panic!("unexpected event: {:?}", other),
    }
    facade.observe().wait_for(|s| s.is_none()).await?;
    assert!(!facade.is_recording());
    assert_eq!(artifact_count(temp_dir.path())?, 0);

    facade.start("next", OutputProfile::Narrowband);
    facade
        .observe()
        .wait_for(|s| s.as_ref().is_some_and(|s| s.session_id == "next"))
        .await?;
    assert!(facade.is_recording());

    facade.cleanup();
    facade.observe().wait_for(|s| s.is_none()).await?;
    assert_eq!(artifact_count(temp_dir.path())?, 0);

    handle.terminate().await;
    Ok(())
}

#[tokio::test]
async fn test_unavailable_device_fails_start() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut recorder = wav_recorder(temp_dir.path(), SyntheticBackend::unavailable());

    let result = recorder.start(OutputProfile::Narrowband).await;

    assert!(matches!(result, Err(RecorderError::DeviceUnavailable(_))));
    assert!(!recorder.is_recording());
    assert_eq!(artifact_count(temp_dir.path())?, 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_controller_with_wav_recorder() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let recorder = wav_recorder(temp_dir.path(), SyntheticBackend::default());
    let (facade, handle) = SessionController::new(
        Box::new(recorder),
        Arc::new(IntervalScheduler::new()),
        Arc::new(SessionStore::new()),
    )
    .spawn();

    facade.start("wav-session", OutputProfile::Narrowband);
    sleep(Duration::from_millis(2500)).await;

    let live = facade.current().expect("session should exist");
    assert_eq!(live.duration_ms, 2000);
    assert!(live.amplitude > 0);

    facade.stop();
    facade
        .observe()
        .wait_for(|s| s.as_ref().is_some_and(|s| s.file.is_some()))
        .await?;
    let path = facade.current().and_then(|s| s.file).expect("file should be set");
    assert!(hound::WavReader::open(&path)?.len() > 0);

    facade.cleanup();
    facade.observe().wait_for(|s| s.is_none()).await?;
    assert!(!path.exists());
    assert_eq!(artifact_count(temp_dir.path())?, 0);

    handle.terminate().await;
    Ok(())
}
