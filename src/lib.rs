pub mod audio;
pub mod config;
pub mod error;
pub mod recorder;
pub mod scheduler;
pub mod session;

pub use audio::{AudioBackend, AudioBackendConfig, AudioFrame, SyntheticBackend};
pub use config::Config;
pub use error::{RecorderError, SessionError};
pub use recorder::{MemoryRecorder, OutputProfile, ProfileSettings, ProfileTable, Recorder, WavRecorder};
pub use scheduler::{IntervalScheduler, PollHandle, Scheduler};
pub use session::{
    ControllerHandle, RecordingSession, SessionCommand, SessionController, SessionEvent,
    SessionFacade, SessionStore,
};
