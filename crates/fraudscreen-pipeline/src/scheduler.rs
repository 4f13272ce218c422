//! Fixed-delay cycle scheduler.
//!
//! Warms the caches once, then runs cycles on a dedicated thread, sleeping
//! `interval` between the end of one cycle and the start of the next. A
//! failed cycle is logged and the loop carries on; only [`SchedulerHandle::stop`]
//! or an optional cycle cap ends it.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use fraudscreen_types::{CycleOutcome, DetectorConfig, FraudError, Result};

use crate::detector::Detector;

/// Tally of what a scheduler run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Cycle attempts of any outcome.
    pub cycles: u64,
    pub completed: u64,
    pub idle: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Transactions classified across completed cycles.
    pub classified: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
    max_cycles: Option<u64>,
}

impl Scheduler {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_cycles: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.cycle_interval)
    }

    /// Stop after `n` cycle attempts.
    #[must_use]
    pub fn with_max_cycles(mut self, n: u64) -> Self {
        self.max_cycles = Some(n);
        self
    }

    /// Run the loop on a named background thread.
    ///
    /// # Errors
    /// [`FraudError::Io`] if the thread cannot be spawned.
    pub fn spawn(self, detector: Arc<Detector>) -> Result<SchedulerHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("fraudscreen-scheduler".into())
            .spawn(move || self.run(&detector, &flag))?;
        Ok(SchedulerHandle { stop, thread })
    }

    /// Run the loop on the calling thread until `stop` is set or the cap is hit.
    pub fn run(&self, detector: &Detector, stop: &AtomicBool) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        detector.warm();
        tracing::info!(
            interval_ms = self.interval.as_millis(),
            max_cycles = ?self.max_cycles,
            "Scheduler started"
        );

        while !stop.load(Ordering::SeqCst) {
            stats.cycles += 1;
            match detector.run_cycle() {
                Ok(CycleOutcome::Completed(report)) => {
                    stats.completed += 1;
                    stats.classified += report.persisted as u64;
                }
                Ok(CycleOutcome::Idle) => stats.idle += 1,
                Ok(CycleOutcome::Skipped) => stats.skipped += 1,
                // Already logged by the processor with its phase.
                Err(_) => stats.failed += 1,
            }

            detector.resolvers().purge_stale();

            if self.max_cycles.is_some_and(|max| stats.cycles >= max) {
                break;
            }
            pause(self.interval, stop);
        }

        tracing::info!(
            cycles = stats.cycles,
            completed = stats.completed,
            failed = stats.failed,
            "Scheduler stopped"
        );
        stats
    }
}

/// Sleep for `interval` unless `stop` is raised first.
fn pause(interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::park_timeout(deadline - now);
    }
}

/// Control over a spawned scheduler.
pub struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<SchedulerStats>,
}

impl SchedulerHandle {
    /// Ask the loop to exit after the current cycle. Wakes it if sleeping.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.thread.thread().unpark();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the loop to exit.
    ///
    /// # Errors
    /// [`FraudError::Internal`] if the scheduler thread panicked.
    pub fn join(self) -> Result<SchedulerStats> {
        self.thread
            .join()
            .map_err(|_| FraudError::Internal("scheduler thread panicked".into()))
    }

    /// [`stop`](Self::stop) then [`join`](Self::join).
    pub fn shutdown(self) -> Result<SchedulerStats> {
        self.stop();
        self.join()
    }
}

#[cfg(test)]
mod tests {
    use fraudscreen_types::{Account, Device, Identity, SystemClock};

    use super::*;
    use crate::{
        detector::Collaborators,
        memory::{InMemoryEntityService, InMemoryQueue, InMemoryTransactionStore, RecordingSink},
    };

    fn detector(queue: Arc<InMemoryQueue>) -> Arc<Detector> {
        let collaborators = Collaborators {
            identities: Arc::new(InMemoryEntityService::<Identity>::new()),
            accounts: Arc::new(InMemoryEntityService::<Account>::new()),
            devices: Arc::new(InMemoryEntityService::<Device>::new()),
            store: Arc::new(InMemoryTransactionStore::new()),
            source: queue,
            sink: Arc::new(RecordingSink::new()),
            clock: Arc::new(SystemClock),
        };
        Arc::new(Detector::new(DetectorConfig::default(), collaborators).unwrap())
    }

    #[test]
    fn stops_at_the_cycle_cap() {
        let handle = Scheduler::new(Duration::from_millis(1))
            .with_max_cycles(3)
            .spawn(detector(Arc::new(InMemoryQueue::new())))
            .unwrap();
        let stats = handle.join().unwrap();
        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.idle, 3);
    }

    #[test]
    fn stop_interrupts_a_long_delay() {
        let handle = Scheduler::new(Duration::from_secs(3_600))
            .spawn(detector(Arc::new(InMemoryQueue::new())))
            .unwrap();
        let started = Instant::now();
        let stats = handle.shutdown().unwrap();
        assert!(stats.cycles <= 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn failed_cycles_do_not_stop_the_loop() {
        let queue = Arc::new(InMemoryQueue::new());
        queue.set_failing(true);
        let stats = Scheduler::new(Duration::from_millis(1))
            .with_max_cycles(2)
            .run(&detector(queue), &AtomicBool::new(false));
        assert_eq!(stats.failed, 2);
    }
}
