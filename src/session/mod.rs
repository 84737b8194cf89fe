//! Recording session management
//!
//! This module provides the pieces around the single process-wide session:
//! - `SessionStore`: observable snapshot of the current session
//! - `SessionController`: serialized command handling against the recorder
//! - `SessionFacade`: fire-and-forget client handle
//! - Boundary messages carried between facade and controller

mod controller;
mod facade;
mod messages;
mod model;
mod store;

pub use controller::{ControllerHandle, SessionController, AMPLITUDE_INTERVAL, DURATION_INTERVAL};
pub use facade::{ChannelSink, CommandSink, SessionFacade};
pub use messages::{SessionCommand, SessionEvent};
pub use model::RecordingSession;
pub use store::SessionStore;
