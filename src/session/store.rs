use std::fs;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{debug, info};

use super::model::RecordingSession;
use crate::error::SessionError;

/// Single source of truth for the current recording session
///
/// Backed by a `watch` channel: every mutation replaces the whole snapshot,
/// and observers that subscribe late see the latest value immediately.
/// Field setters are no-ops when no session exists, so a poller tick that
/// lands after `clear` cannot bring a session back.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<Option<RecordingSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RecordingSession>> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Option<RecordingSession> {
        self.tx.borrow().clone()
    }

    /// Whether a session exists and has not been finalized yet
    pub fn is_recording(&self) -> bool {
        self.tx
            .borrow()
            .as_ref()
            .is_some_and(RecordingSession::is_recording)
    }

    /// Publish a fresh session with zeroed counters
    ///
    /// Returns `false` and leaves the store untouched if a session already exists.
    pub fn start(&self, session_id: &str) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(RecordingSession::new(session_id));
            true
        })
    }

    pub fn set_duration(&self, duration_ms: u64) {
        self.update(|session| session.duration_ms = duration_ms);
    }

    pub fn set_amplitude(&self, amplitude: u32) {
        self.update(|session| session.amplitude = amplitude);
    }

    /// Mark the current session as finalized with `path`
    pub fn recording_ready(&self, path: PathBuf) {
        self.update(|session| session.file = Some(path));
    }

    /// Remove the current session, deleting its finalized artifact if any
    ///
    /// The session is removed even when deleting the artifact fails; the
    /// failure is returned so it can be reported.
    pub fn clear(&self) -> Result<(), SessionError> {
        let removed = self.tx.send_replace(None);

        let Some(session) = removed else {
            return Ok(());
        };

        info!("Cleared session {}", session.session_id);

        match session.file {
            Some(path) => match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Deleted artifact {:?}", path);
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(SessionError::Storage { path, source }),
            },
            None => Ok(()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut RecordingSession)) {
        self.tx.send_if_modified(|current| match current {
            Some(session) => {
                apply(session);
                true
            }
            None => false,
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
