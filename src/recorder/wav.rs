use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{temp_artifact_path, OutputProfile, ProfileTable, Recorder};
use crate::audio::{AudioBackend, AudioBackendConfig, AudioFrame};
use crate::error::RecorderError;

/// Recorder that drains an `AudioBackend` into a 16-bit PCM WAV artifact
///
/// Artifacts always carry the `wav` extension; the profile only selects the
/// sample rate and channel count the backend is asked for.
pub struct WavRecorder {
    backend: Box<dyn AudioBackend>,
    cache_dir: PathBuf,
    profiles: ProfileTable,
    amplitude: Arc<AtomicU32>,
    active: Option<ActiveCapture>,
}

struct ActiveCapture {
    path: PathBuf,
    writer: JoinHandle<Result<usize, hound::Error>>,
}

impl WavRecorder {
    pub fn new(backend: Box<dyn AudioBackend>, cache_dir: PathBuf, profiles: ProfileTable) -> Self {
        Self {
            backend,
            cache_dir,
            profiles,
            amplitude: Arc::new(AtomicU32::new(0)),
            active: None,
        }
    }

    /// Stop the backend and wait for the writer to finalize the file
    ///
    /// Returns the artifact path together with the outcome of finalizing it,
    /// or `None` when nothing was being captured.
    async fn release(&mut self) -> Option<(PathBuf, Result<(), RecorderError>)> {
        let capture = self.active.take()?;

        if self.backend.is_capturing() {
            if let Err(e) = self.backend.stop().await {
                warn!("Failed to stop {} cleanly: {}", self.backend.name(), e);
            }
        }
        self.amplitude.store(0, Ordering::SeqCst);

        let outcome = match capture.writer.await {
            Ok(Ok(samples)) => {
                debug!("Finalized {:?} ({} samples)", capture.path, samples);
                Ok(())
            }
            Ok(Err(e)) => Err(RecorderError::Encoding(e)),
            Err(e) => Err(RecorderError::Io(std::io::Error::other(e))),
        };

        Some((capture.path, outcome))
    }
}

#[async_trait::async_trait]
impl Recorder for WavRecorder {
    async fn start(&mut self, profile: OutputProfile) -> Result<(), RecorderError> {
        if self.active.is_some() {
            return Err(RecorderError::DeviceUnavailable(
                "recorder is already capturing".to_string(),
            ));
        }

        let settings = self.profiles.get(profile).clone();
        fs::create_dir_all(&self.cache_dir)?;

        let config = AudioBackendConfig {
            sample_rate: settings.sample_rate,
            channels: settings.channels,
            buffer_duration_ms: 100,
        };

        let frames = self
            .backend
            .start(config)
            .await
            .map_err(|e| RecorderError::DeviceUnavailable(format!("{:#}", e)))?;

        let path = temp_artifact_path(&self.cache_dir, "wav");
        let spec = hound::WavSpec {
            channels: settings.channels,
            sample_rate: settings.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = match hound::WavWriter::create(&path, spec) {
            Ok(writer) => writer,
            Err(e) => {
                if let Err(stop_err) = self.backend.stop().await {
                    warn!("Failed to stop {} after open error: {}", self.backend.name(), stop_err);
                }
                return Err(RecorderError::Encoding(e));
            }
        };

        info!(
            "Capturing {:?} from {} into {:?} ({}Hz, {} channels, {} bit/s requested)",
            profile,
            self.backend.name(),
            path,
            settings.sample_rate,
            settings.channels,
            settings.bit_rate
        );

        let amplitude = Arc::clone(&self.amplitude);
        let task = tokio::spawn(write_frames(frames, writer, amplitude));

        self.active = Some(ActiveCapture { path, writer: task });
        Ok(())
    }

    async fn stop(&mut self) -> Result<PathBuf, RecorderError> {
        let (path, outcome) = self.release().await.ok_or(RecorderError::NotRecording)?;

        if let Err(e) = outcome {
            warn!("Finalizing {:?} failed, discarding it: {}", path, e);
            if let Err(remove_err) = discard(&path) {
                warn!("Failed to remove {:?}: {}", path, remove_err);
            }
            return Err(e);
        }

        info!("Recording finalized: {:?}", path);
        Ok(path)
    }

    async fn cancel(&mut self) -> Result<(), RecorderError> {
        let Some((path, outcome)) = self.release().await else {
            return Ok(());
        };

        if let Err(e) = &outcome {
            warn!("Discarding partially written artifact {:?}: {}", path, e);
        }

        discard(&path)?;
        info!("Recording cancelled, removed {:?}", path);
        Ok(())
    }

    fn amplitude(&self) -> u32 {
        if self.active.is_some() {
            self.amplitude.load(Ordering::SeqCst)
        } else {
            0
        }
    }

    fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    fn name(&self) -> &str {
        "wav"
    }
}

/// Remove an artifact that will never be handed off
fn discard(path: &Path) -> Result<(), RecorderError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RecorderError::Io(e)),
    }
}

async fn write_frames(
    mut frames: mpsc::Receiver<AudioFrame>,
    mut writer: hound::WavWriter<BufWriter<File>>,
    amplitude: Arc<AtomicU32>,
) -> Result<usize, hound::Error> {
    let mut written = 0;

    while let Some(frame) = frames.recv().await {
        for &sample in &frame.samples {
            writer.write_sample(sample)?;
        }
        written += frame.samples.len();
        amplitude.store(frame.peak(), Ordering::SeqCst);
    }

    writer.finalize()?;
    Ok(written)
}
