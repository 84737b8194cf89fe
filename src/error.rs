use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a `Recorder` implementation
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The capture device could not be acquired
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// `stop` was called while nothing was being captured
    #[error("recorder is not recording")]
    NotRecording,

    #[error("recorder I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode artifact: {0}")]
    Encoding(#[from] hound::Error),
}

/// Errors surfaced by the session controller and store
#[derive(Debug, Error)]
pub enum SessionError {
    /// The recorder could not begin capture; the `Start` command was rolled back
    #[error("failed to acquire recorder for session {session_id}: {source}")]
    ResourceAcquisition {
        session_id: String,
        #[source]
        source: RecorderError,
    },

    /// An artifact could not be finalized or removed from storage
    #[error("storage failure for {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The controller task is no longer accepting commands
    #[error("session controller has stopped")]
    ControllerStopped,
}
