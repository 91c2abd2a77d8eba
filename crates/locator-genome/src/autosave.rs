//! Periodic knowledge flushing.
//!
//! [`FlushScheduler`] decides from the injected [`Clock`](crate::clock::Clock)
//! whether a flush is due. [`spawn_autosave`] polls it from a tokio interval
//! task, so the wall clock and not the tokio timer sets the flush cadence.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::clock::SharedClock;
use crate::store::HistoryStore;

/// Polls per flush interval
const POLLS_PER_INTERVAL: u32 = 4;

/// Store shared between the tracker and the autosave task
pub type SharedStore = Arc<Mutex<HistoryStore>>;

/// Lock a shared store, recovering from a poisoned lock
pub fn lock_store(store: &Mutex<HistoryStore>) -> MutexGuard<'_, HistoryStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decides when a dirty store should be flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushScheduler {
    interval_ms: u64,
    last_flush_ms: u64,
}

impl FlushScheduler {
    /// Scheduler whose first flush is due `interval` after `start_ms`
    #[must_use]
    pub const fn new(interval: Duration, start_ms: u64) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            last_flush_ms: start_ms,
        }
    }

    /// Whether an interval has elapsed since the last flush
    #[must_use]
    pub const fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_flush_ms) >= self.interval_ms
    }

    /// Time of the last flush attempt
    #[must_use]
    pub const fn last_flush_ms(&self) -> u64 {
        self.last_flush_ms
    }

    /// Flush `store` if the interval elapsed and it is dirty.
    ///
    /// Returns whether the store was written.
    pub fn tick(&mut self, store: &mut HistoryStore, now_ms: u64) -> bool {
        if !self.is_due(now_ms) {
            return false;
        }
        self.last_flush_ms = now_ms;
        store.flush_if_dirty()
    }
}

/// Handle to a running autosave task
#[derive(Debug)]
pub struct AutosaveHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Stop the task after a final flush
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "autosave task ended abnormally");
        }
    }

    /// Whether the task has stopped
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn a task that flushes `store` when dirty and `interval` has passed on `clock`.
///
/// The task wakes a few times per interval and asks a [`FlushScheduler`]
/// whether a flush is due. Dropping the handle also stops the task, after
/// the same final flush as [`AutosaveHandle::shutdown`]. Must be called from
/// within a tokio runtime.
pub fn spawn_autosave(
    store: SharedStore,
    clock: SharedClock,
    interval: Duration,
) -> AutosaveHandle {
    let interval = interval.max(Duration::from_millis(1));
    let poll = (interval / POLLS_PER_INTERVAL).max(Duration::from_millis(1));
    let mut scheduler = FlushScheduler::new(interval, clock.now_ms());
    let (tx, mut rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = clock.now_ms();
                    if scheduler.tick(&mut lock_store(&store), now) {
                        debug!(now, "autosave flushed knowledge");
                    }
                }
                _ = &mut rx => break,
            }
        }

        lock_store(&store).flush_if_dirty();
        debug!("autosave stopped");
    });

    AutosaveHandle {
        shutdown: Some(tx),
        task,
    }
}
