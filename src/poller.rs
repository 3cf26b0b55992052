//! Pollers — Per-class Fixed-cadence Schedulers
//!
//! One poller per instrument class, each on its own interval,
//! uncoordinated with the others. Start fires an immediate tick and
//! then repeats; ticks are sequential (one fetch per tick, no overlap).
//! Stop is idempotent and deterministic: it bumps a generation counter
//! and aborts the task, so no timer callback survives it, and a tick
//! whose fetch completes after stop observes the stale generation and
//! discards its result instead of mutating the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Handed to every tick closure; must be consulted between fetch
/// completion and store write.
#[derive(Debug, Clone)]
pub struct PollGuard {
    generation: Arc<AtomicU64>,
    started_as: u64,
}

impl PollGuard {
    /// True once the owning poller has been stopped or restarted since
    /// this tick began.
    pub fn is_cancelled(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.started_as
    }
}

/// Fixed-interval scheduler with explicit start/stop lifecycle.
pub struct Poller {
    name: String,
    interval: Duration,
    generation: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            generation: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn task_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Whether a polling task is currently scheduled.
    pub fn is_running(&self) -> bool {
        self.task_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the polling task. The first tick fires immediately. A
    /// second start while running is a no-op.
    pub fn start<F, Fut>(&self, tick: F)
    where
        F: Fn(PollGuard) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.task_slot();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!(poller = %self.name, "Start ignored, already running");
            return;
        }

        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let interval = self.interval;

        info!(poller = %self.name, interval_ms = interval.as_millis() as u64, "Poller started");

        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let guard = PollGuard {
                    generation: Arc::clone(&generation),
                    started_as: my_generation,
                };
                tick(guard).await;
                if generation.load(Ordering::SeqCst) != my_generation {
                    return;
                }
            }
        }));
    }

    /// Cancel the pending timer and invalidate in-flight ticks.
    /// Safe to call repeatedly.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.task_slot().take() {
            handle.abort();
            info!(poller = %self.name, "Poller stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
