//! Single-flight request coalescer.
//!
//! Among concurrent callers asking for the same key, exactly one (the
//! leader) runs the supplier; the rest (followers) block on the leader's
//! result cell and receive a clone of the same value or the same error.
//!
//! ## Lifecycle of a key
//!
//! ```text
//! absent ──insert-if-absent──→ in flight ──leader settles──→ absent
//!                                   ↑ followers join here
//! ```
//!
//! The registry entry is removed *before* the result is published, so a
//! caller arriving after the leader's supplier returned always starts a
//! fresh flight and never reuses a finished one. Removal runs from a drop
//! guard: a leader that panics still releases the key and its followers
//! receive [`FraudError::FlightAbandoned`].
//!
//! Entries older than `stale_after` are treated as leaked and replaced, and
//! followers never wait longer than `wait_timeout`.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::entry::Entry};
use fraudscreen_types::{CoalescerConfig, FraudError, Result};
use parking_lot::{Condvar, Mutex};

/// One in-flight request: a result cell with one writer and many readers.
struct Flight<T> {
    started: Instant,
    outcome: Mutex<Option<Result<T>>>,
    settled: Condvar,
}

impl<T: Clone> Flight<T> {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            outcome: Mutex::new(None),
            settled: Condvar::new(),
        }
    }

    fn is_stale(&self, stale_after: Duration) -> bool {
        self.started.elapsed() >= stale_after
    }

    /// Publish the outcome. Only the first call has any effect.
    fn complete(&self, outcome: Result<T>) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
            self.settled.notify_all();
        }
    }

    fn wait(&self, key: &str, timeout: Duration) -> Result<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            if self.settled.wait_until(&mut slot, deadline).timed_out() {
                return slot.as_ref().map_or_else(
                    || {
                        Err(FraudError::CoalescedWaitTimeout {
                            key: key.to_string(),
                            waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        })
                    },
                    Clone::clone,
                );
            }
        }
    }
}

enum Role<T> {
    Leader(Arc<Flight<T>>),
    Follower(Arc<Flight<T>>),
}

/// Releases the leader's registry entry however the leader exits.
struct LeaderGuard<'a, T: Clone> {
    registry: &'a DashMap<String, Arc<Flight<T>>>,
    key: &'a str,
    flight: Arc<Flight<T>>,
}

impl<T: Clone> LeaderGuard<'_, T> {
    fn release(&self) {
        // Identity check: a stale-eviction may already have replaced this
        // entry with a newer flight for the same key.
        self.registry
            .remove_if(self.key, |_, current| Arc::ptr_eq(current, &self.flight));
    }

    fn settle(self, outcome: Result<T>) {
        self.release();
        self.flight.complete(outcome);
    }
}

impl<T: Clone> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        self.release();
        self.flight.complete(Err(FraudError::FlightAbandoned {
            key: self.key.to_string(),
        }));
    }
}

/// Deduplicates concurrent requests for the same key.
pub struct RequestCoalescer<T> {
    in_flight: DashMap<String, Arc<Flight<T>>>,
    config: CoalescerConfig,
}

impl<T: Clone> RequestCoalescer<T> {
    #[must_use]
    pub fn new(config: CoalescerConfig) -> Self {
        Self {
            in_flight: DashMap::new(),
            config,
        }
    }

    /// Run `supplier` for `key` unless another caller already is, in which
    /// case wait for and return that caller's outcome.
    pub fn execute<F>(&self, key: &str, supplier: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let flight = match self.join_or_lead(key) {
            Role::Follower(flight) => {
                tracing::debug!(key, "Joining in-flight request");
                return flight.wait(key, self.config.wait_timeout);
            }
            Role::Leader(flight) => flight,
        };

        let guard = LeaderGuard {
            registry: &self.in_flight,
            key,
            flight,
        };
        let outcome = supplier();
        if let Err(err) = &outcome {
            tracing::debug!(key, error = %err, "Coalesced request failed");
        }
        guard.settle(outcome.clone());
        outcome
    }

    fn join_or_lead(&self, key: &str) -> Role<T> {
        let existing = self.in_flight.get(key).map(|e| Arc::clone(e.value()));
        if let Some(existing) = existing {
            if !existing.is_stale(self.config.stale_after) {
                return Role::Follower(existing);
            }
            tracing::warn!(
                key,
                age_ms = u64::try_from(existing.started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "Evicting stale in-flight request"
            );
            self.in_flight
                .remove_if(key, |_, current| Arc::ptr_eq(current, &existing));
        }

        // Insert-if-absent: the loser of a race joins the winner.
        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => Role::Follower(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let flight = Arc::new(Flight::new());
                entry.insert(Arc::clone(&flight));
                Role::Leader(flight)
            }
        }
    }

    /// Drop every entry older than `stale_after`. Returns how many went.
    pub fn purge_stale(&self) -> usize {
        let before = self.in_flight.len();
        let stale_after = self.config.stale_after;
        self.in_flight.retain(|_, flight| !flight.is_stale(stale_after));
        let purged = before.saturating_sub(self.in_flight.len());
        if purged > 0 {
            tracing::warn!(purged, "Purged stale in-flight requests");
        }
        purged
    }

    /// Number of keys currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
