//! Recorder capability
//!
//! A `Recorder` owns one stateful capture resource. It is non-reentrant: a
//! second `start` without an intervening `stop`/`cancel` is a contract
//! violation, and callers are expected to consult `is_recording` first.
//!
//! Implementations:
//! - `WavRecorder`: drains an `AudioBackend` into a temporary WAV artifact
//! - `MemoryRecorder`: in-memory fake for tests and embedders

mod memory;
mod profile;
mod wav;

pub use memory::MemoryRecorder;
pub use profile::{OutputProfile, ProfileSettings, ProfileTable};
pub use wav::WavRecorder;

use crate::error::RecorderError;
use std::path::{Path, PathBuf};

#[async_trait::async_trait]
pub trait Recorder: Send + Sync {
    /// Begin capture into a new temporary artifact selected by `profile`
    async fn start(&mut self, profile: OutputProfile) -> Result<(), RecorderError>;

    /// Finalize the artifact, release the resource and return the artifact path
    ///
    /// When finalizing fails the artifact is discarded before the error is returned.
    async fn stop(&mut self) -> Result<PathBuf, RecorderError>;

    /// Release the resource and discard the in-progress artifact
    ///
    /// No-op when not recording.
    async fn cancel(&mut self) -> Result<(), RecorderError>;

    /// Instantaneous input level, `0` when not recording
    fn amplitude(&self) -> u32;

    fn is_recording(&self) -> bool;

    /// Get recorder name for logging
    fn name(&self) -> &str;
}

/// Build a unique temporary artifact path inside `dir`
pub(crate) fn temp_artifact_path(dir: &Path, extension: &str) -> PathBuf {
    dir.join(format!("recording-{}.{}", uuid::Uuid::new_v4(), extension))
}
