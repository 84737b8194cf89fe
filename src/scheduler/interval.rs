use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::{PollHandle, Scheduler, TickFn};

/// Scheduler backed by `tokio::time::interval`, one task per poller
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct IntervalScheduler;

impl IntervalScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for IntervalScheduler {
    fn repeat(&self, interval: Duration, mut tick: TickFn) -> PollHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                tick().await;
            }

            debug!("Poller ({:?}) ended", interval);
        });

        PollHandle::new(cancelled, Some(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;

    fn counting_tick(count: &Arc<AtomicUsize>) -> TickFn {
        let count = Arc::clone(count);
        Box::new(move || {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_fires_immediately() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = IntervalScheduler::new().repeat(Duration::from_millis(1000), counting_tick(&count));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_cancel() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = IntervalScheduler::new().repeat(Duration::from_millis(100), counting_tick(&count));

        tokio::time::sleep(Duration::from_millis(250)).await;
        handle.cancel();
        handle.cancel();
        let seen = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
        assert!(handle.is_cancelled());
    }
}
