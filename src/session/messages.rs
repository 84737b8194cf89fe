use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::recorder::OutputProfile;

/// Command carried from a facade to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionCommand {
    Start {
        session_id: String,
        profile: OutputProfile,
    },
    Stop,
    Cleanup,
    /// The host is tearing the controller down
    AbnormalTermination,
}

/// Failure notifications published by the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    StartFailed { session_id: String, reason: String },
    /// Finalizing or deleting an artifact failed; `path` is known when the
    /// failure happened on a finalized file
    StorageFailed {
        path: Option<PathBuf>,
        reason: String,
    },
}
