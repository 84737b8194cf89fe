//! Periodic poller capability
//!
//! The controller drives its duration and amplitude pollers through the
//! `Scheduler` trait so tests and embedders can swap the timing source.

mod interval;

pub use interval::IntervalScheduler;

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

/// Callback invoked on every tick
pub type TickFn = Box<dyn FnMut() -> BoxFuture<'static, ()> + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Fire `tick` every `interval`, starting immediately, until the handle is cancelled
    fn repeat(&self, interval: Duration, tick: TickFn) -> PollHandle;
}

/// Cancellable handle to a running poller
///
/// `cancel` may be called any number of times from any task. Once it returns
/// no new tick begins; a tick already in flight may still complete unless the
/// owner also awaits `join`.
#[derive(Debug)]
pub struct PollHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn new(cancelled: Arc<AtomicBool>, task: Option<JoinHandle<()>>) -> Self {
        Self { cancelled, task }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel and wait until the poller task has fully ended
    pub async fn join(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Poller task panicked: {}", e);
                }
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
