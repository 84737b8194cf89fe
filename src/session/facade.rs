use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::warn;

use super::messages::{SessionCommand, SessionEvent};
use super::model::RecordingSession;
use crate::error::SessionError;
use crate::recorder::OutputProfile;

/// Transport seam between a facade and the controller
///
/// The in-process implementation is `ChannelSink`; a cross-process transport
/// only needs to deliver `SessionCommand`s in order.
pub trait CommandSink: Send + Sync {
    fn send(&self, command: SessionCommand) -> Result<(), SessionError>;
}

/// Forwards commands onto the controller's queue in the same process
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { tx }
    }
}

impl CommandSink for ChannelSink {
    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx
            .send(command)
            .map_err(|_| SessionError::ControllerStopped)
    }
}

/// Client-facing handle onto the recording session
///
/// Commands are fire-and-forget: they are queued for the controller and the
/// resulting state arrives asynchronously through `observe`.
#[derive(Clone)]
pub struct SessionFacade {
    sink: Arc<dyn CommandSink>,
    state: watch::Receiver<Option<RecordingSession>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionFacade {
    pub fn new(
        sink: Arc<dyn CommandSink>,
        state: watch::Receiver<Option<RecordingSession>>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            sink,
            state,
            events,
        }
    }

    /// Live view of the current session
    pub fn observe(&self) -> watch::Receiver<Option<RecordingSession>> {
        self.state.clone()
    }

    /// Latest snapshot
    pub fn current(&self) -> Option<RecordingSession> {
        self.state.borrow().clone()
    }

    /// True while a session exists and has not been finalized
    pub fn is_recording(&self) -> bool {
        self.state
            .borrow()
            .as_ref()
            .is_some_and(RecordingSession::is_recording)
    }

    /// Failure notifications from the controller
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn start(&self, session_id: impl Into<String>, profile: OutputProfile) {
        self.forward(SessionCommand::Start {
            session_id: session_id.into(),
            profile,
        });
    }

    pub fn stop(&self) {
        self.forward(SessionCommand::Stop);
    }

    pub fn cleanup(&self) {
        self.forward(SessionCommand::Cleanup);
    }

    fn forward(&self, command: SessionCommand) {
        if let Err(e) = self.sink.send(command) {
            warn!("Dropping command: {}", e);
        }
    }
}
