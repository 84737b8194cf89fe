use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::facade::{ChannelSink, SessionFacade};
use super::messages::{SessionCommand, SessionEvent};
use super::store::SessionStore;
use crate::error::SessionError;
use crate::recorder::{OutputProfile, Recorder};
use crate::scheduler::{PollHandle, Scheduler, TickFn};

/// Period of the duration poller; each tick advances the reported duration by this much
pub const DURATION_INTERVAL: Duration = Duration::from_millis(1000);

/// Period of the amplitude poller
pub const AMPLITUDE_INTERVAL: Duration = Duration::from_millis(100);

type SharedRecorder = Arc<Mutex<Box<dyn Recorder>>>;

/// The two pollers that run while a recording is active
struct Pollers {
    duration: PollHandle,
    amplitude: PollHandle,
}

impl Pollers {
    /// Cancel both pollers and wait until neither can tick again
    async fn shutdown(self) {
        self.duration.cancel();
        self.amplitude.cancel();
        self.duration.join().await;
        self.amplitude.join().await;
    }
}

/// Session state machine
///
/// Owns the recorder and the pollers exclusively. All commands are consumed
/// from one queue by one task, so `Start`, `Stop`, `Cleanup` and teardown
/// never interleave.
pub struct SessionController {
    recorder: SharedRecorder,
    scheduler: Arc<dyn Scheduler>,
    store: Arc<SessionStore>,
    events: broadcast::Sender<SessionEvent>,
    pollers: Option<Pollers>,
}

/// Owner-side handle to a running controller
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    task: JoinHandle<()>,
}

impl ControllerHandle {
    /// Signal abnormal termination and wait for the controller to release everything
    pub async fn terminate(self) {
        if self.commands.send(SessionCommand::AbnormalTermination).is_err() {
            debug!("Controller already stopped");
        }
        if let Err(e) = self.task.await {
            error!("Session controller task panicked: {}", e);
        }
    }
}

impl SessionController {
    pub fn new(
        recorder: Box<dyn Recorder>,
        scheduler: Arc<dyn Scheduler>,
        store: Arc<SessionStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(32);

        Self {
            recorder: Arc::new(Mutex::new(recorder)),
            scheduler,
            store,
            events,
            pollers: None,
        }
    }

    /// Run the controller on its own task
    ///
    /// Returns the client facade and the owner handle. The controller stops
    /// after an abnormal-termination command, or once every command sender
    /// has been dropped; both paths release the recorder and clear the store.
    pub fn spawn(self) -> (SessionFacade, ControllerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();

        let facade = SessionFacade::new(
            Arc::new(ChannelSink::new(tx.clone())),
            self.store.subscribe(),
            self.events.clone(),
        );

        let task = tokio::spawn(self.run(rx));

        (facade, ControllerHandle { commands: tx, task })
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        info!("Session controller started");

        while let Some(command) = commands.recv().await {
            debug!("Handling {:?}", command);

            match command {
                SessionCommand::Start {
                    session_id,
                    profile,
                } => self.start(session_id, profile).await,
                SessionCommand::Stop => self.stop().await,
                SessionCommand::Cleanup => self.cleanup().await,
                SessionCommand::AbnormalTermination => {
                    warn!("Abnormal termination requested, releasing session");
                    self.cleanup().await;
                    info!("Session controller stopped");
                    return;
                }
            }
        }

        warn!("Command channel closed, releasing session");
        self.cleanup().await;
        info!("Session controller stopped");
    }

    async fn start(&mut self, session_id: String, profile: OutputProfile) {
        if session_id.is_empty() {
            warn!("Ignoring start without a session id");
            self.publish(SessionEvent::StartFailed {
                session_id,
                reason: "session id must not be empty".to_string(),
            });
            return;
        }

        {
            let mut recorder = self.recorder.lock().await;

            if recorder.is_recording() {
                info!("Already recording, ignoring start for {}", session_id);
                return;
            }

            if !self.store.start(&session_id) {
                warn!(
                    "A finished session is awaiting cleanup, ignoring start for {}",
                    session_id
                );
                return;
            }

            if let Err(source) = recorder.start(profile).await {
                let err = SessionError::ResourceAcquisition {
                    session_id: session_id.clone(),
                    source,
                };
                error!("{}", err);

                // Nothing was finalized yet, so clearing cannot touch storage.
                if let Err(e) = self.store.clear() {
                    warn!("Rollback of session {} failed: {}", session_id, e);
                }

                self.publish(SessionEvent::StartFailed {
                    session_id,
                    reason: err.to_string(),
                });
                return;
            }

            info!(
                "Recording session {} started on {} ({:?})",
                session_id,
                recorder.name(),
                profile
            );
        }

        self.pollers = Some(Pollers {
            duration: self
                .scheduler
                .repeat(DURATION_INTERVAL, self.duration_tick()),
            amplitude: self
                .scheduler
                .repeat(AMPLITUDE_INTERVAL, self.amplitude_tick()),
        });
    }

    async fn stop(&mut self) {
        self.stop_pollers().await;

        let mut recorder = self.recorder.lock().await;
        if !recorder.is_recording() {
            debug!("Stop requested while not recording");
            return;
        }

        match recorder.stop().await {
            Ok(path) => {
                info!("Recording ready at {:?}", path);
                self.store.recording_ready(path);
            }
            Err(e) => {
                error!("Failed to finalize recording: {}", e);

                // The recorder already discarded the artifact; drop the
                // session so it no longer reads as recording.
                if let Err(clear_err) = self.store.clear() {
                    warn!("Failed to drop unfinalized session: {}", clear_err);
                }

                self.publish(SessionEvent::StorageFailed {
                    path: None,
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn cleanup(&mut self) {
        self.stop_pollers().await;

        {
            let mut recorder = self.recorder.lock().await;
            if let Err(e) = recorder.cancel().await {
                error!("Failed to cancel recorder: {}", e);
                self.publish(SessionEvent::StorageFailed {
                    path: None,
                    reason: e.to_string(),
                });
            }
        }

        if let Err(e) = self.store.clear() {
            error!("{}", e);
            let path = match &e {
                SessionError::Storage { path, .. } => Some(path.clone()),
                _ => None,
            };
            self.publish(SessionEvent::StorageFailed {
                path,
                reason: e.to_string(),
            });
        }
    }

    /// Pollers must be fully stopped before the recorder is released
    async fn stop_pollers(&mut self) {
        if let Some(pollers) = self.pollers.take() {
            pollers.shutdown().await;
        }
    }

    fn duration_tick(&self) -> TickFn {
        let store = Arc::clone(&self.store);
        let step = DURATION_INTERVAL.as_millis() as u64;
        let mut duration_ms = 0u64;

        Box::new(move || {
            let store = Arc::clone(&store);
            let current = duration_ms;
            duration_ms += step;

            async move {
                if store.is_recording() {
                    store.set_duration(current);
                }
            }
            .boxed()
        })
    }

    fn amplitude_tick(&self) -> TickFn {
        let store = Arc::clone(&self.store);
        let recorder = Arc::clone(&self.recorder);

        Box::new(move || {
            let store = Arc::clone(&store);
            let recorder = Arc::clone(&recorder);

            async move {
                let recorder = recorder.lock().await;
                if recorder.is_recording() && store.is_recording() {
                    store.set_amplitude(recorder.amplitude());
                }
            }
            .boxed()
        })
    }

    fn publish(&self, event: SessionEvent) {
        // Fails only when nobody is subscribed
        let _ = self.events.send(event);
    }
}
