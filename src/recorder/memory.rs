use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{temp_artifact_path, OutputProfile, ProfileTable, Recorder};
use crate::error::RecorderError;

/// In-memory recorder
///
/// Creates an empty artifact on `start` instead of capturing anything. Clones
/// share state, so a test can keep one handle while the controller owns the
/// other.
#[derive(Clone)]
pub struct MemoryRecorder {
    inner: Arc<Mutex<MemoryState>>,
}

struct MemoryState {
    cache_dir: PathBuf,
    profiles: ProfileTable,
    current: Option<PathBuf>,
    amplitude: u32,
    recordings: Vec<(OutputProfile, PathBuf)>,
    cancelled: bool,
    start_failure: Option<String>,
    stop_failure: Option<String>,
}

impl MemoryRecorder {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                cache_dir: cache_dir.into(),
                profiles: ProfileTable::default(),
                current: None,
                amplitude: 0,
                recordings: Vec::new(),
                cancelled: false,
                start_failure: None,
                stop_failure: None,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the level reported while recording
    pub fn set_amplitude(&self, amplitude: u32) {
        self.state().amplitude = amplitude;
    }

    /// Make every subsequent `start` fail as if the device were busy
    pub fn fail_next_starts(&self, reason: impl Into<String>) {
        self.state().start_failure = Some(reason.into());
    }

    /// Make every subsequent `stop` fail to finalize, discarding the artifact
    pub fn fail_next_stops(&self, reason: impl Into<String>) {
        self.state().stop_failure = Some(reason.into());
    }

    /// Every capture started so far, in order
    pub fn recordings(&self) -> Vec<(OutputProfile, PathBuf)> {
        self.state().recordings.clone()
    }

    /// Whether any capture has been cancelled
    pub fn was_cancelled(&self) -> bool {
        self.state().cancelled
    }

    /// Path of the most recently started artifact
    pub fn last_file(&self) -> Option<PathBuf> {
        self.state().recordings.last().map(|(_, path)| path.clone())
    }
}

#[async_trait::async_trait]
impl Recorder for MemoryRecorder {
    async fn start(&mut self, profile: OutputProfile) -> Result<(), RecorderError> {
        let mut state = self.state();

        if let Some(reason) = &state.start_failure {
            return Err(RecorderError::DeviceUnavailable(reason.clone()));
        }
        if state.current.is_some() {
            return Err(RecorderError::DeviceUnavailable(
                "recorder is already capturing".to_string(),
            ));
        }

        fs::create_dir_all(&state.cache_dir)?;
        let extension = state.profiles.get(profile).extension.clone();
        let path = temp_artifact_path(&state.cache_dir, &extension);
        fs::write(&path, b"")?;

        debug!("Memory recorder started {:?}", path);
        state.recordings.push((profile, path.clone()));
        state.current = Some(path);
        Ok(())
    }

    async fn stop(&mut self) -> Result<PathBuf, RecorderError> {
        let mut state = self.state();
        let path = state.current.take().ok_or(RecorderError::NotRecording)?;

        if let Some(reason) = &state.stop_failure {
            match fs::remove_file(&path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
            return Err(RecorderError::Io(std::io::Error::other(reason.clone())));
        }

        Ok(path)
    }

    async fn cancel(&mut self) -> Result<(), RecorderError> {
        let mut state = self.state();
        if let Some(path) = state.current.take() {
            state.cancelled = true;
            match fs::remove_file(&path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        Ok(())
    }

    fn amplitude(&self) -> u32 {
        let state = self.state();
        if state.current.is_some() {
            state.amplitude
        } else {
            0
        }
    }

    fn is_recording(&self) -> bool {
        self.state().current.is_some()
    }

    fn name(&self) -> &str {
        "memory"
    }
}
