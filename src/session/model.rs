use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Snapshot of the current recording session
///
/// `file` is `None` while capture is in progress and holds the finalized
/// artifact once the session has been stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSession {
    pub session_id: String,
    pub file: Option<PathBuf>,
    pub duration_ms: u64,
    pub amplitude: u32,
}

impl RecordingSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            file: None,
            duration_ms: 0,
            amplitude: 0,
        }
    }

    /// Whether capture is still running for this session
    pub fn is_recording(&self) -> bool {
        self.file.is_none()
    }
}
