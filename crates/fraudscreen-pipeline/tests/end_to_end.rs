//! End-to-end screening tests.
//!
//! Wires a [`Detector`] over the in-memory collaborators and drives whole
//! cycles: prefetch call counts, classification, dispatch, persistence,
//! cross-cycle history, warm-up and failure handling.

use std::{
    sync::{Arc, Barrier},
    thread,
};

use chrono::{DateTime, TimeDelta, Utc};
use fraudscreen_pipeline::{
    Collaborators, Detector,
    memory::{InMemoryEntityService, InMemoryQueue, InMemoryTransactionStore, RecordingSink},
};
use fraudscreen_types::*;
use rust_decimal::Decimal;

struct World {
    now: DateTime<Utc>,
    clock: Arc<ManualClock>,
    identities: Arc<InMemoryEntityService<Identity>>,
    accounts: Arc<InMemoryEntityService<Account>>,
    devices: Arc<InMemoryEntityService<Device>>,
    store: Arc<InMemoryTransactionStore>,
    queue: Arc<InMemoryQueue>,
    sink: Arc<RecordingSink>,
}

impl World {
    /// Two identities, their accounts (p2's nearly empty) and one device.
    fn new() -> Self {
        let now = Utc::now();
        Self {
            now,
            clock: Arc::new(ManualClock::new(now)),
            identities: Arc::new(InMemoryEntityService::with_entities(
                ["p1", "p2"].map(Identity::clean),
            )),
            accounts: Arc::new(InMemoryEntityService::with_entities([
                Account::open("ACC-p1", "p1", Decimal::new(1_000, 0)),
                Account::open("ACC-p2", "p2", Decimal::new(5, 0)),
            ])),
            devices: Arc::new(InMemoryEntityService::with_entities([Device::clean("m1")])),
            store: Arc::new(InMemoryTransactionStore::new()),
            queue: Arc::new(InMemoryQueue::new()),
            sink: Arc::new(RecordingSink::new()),
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            identities: self.identities.clone(),
            accounts: self.accounts.clone(),
            devices: self.devices.clone(),
            store: self.store.clone(),
            source: self.queue.clone(),
            sink: self.sink.clone(),
            clock: self.clock.clone(),
        }
    }

    fn detector(&self) -> Detector {
        Detector::new(DetectorConfig::default(), self.collaborators()).unwrap()
    }

    fn tx(&self, sender: &str, recipient: &str) -> Transaction {
        Transaction::dummy(sender, recipient, "m1", self.now)
    }

    fn many_calls(&self) -> (usize, usize, usize) {
        (
            self.identities.calls().many.len(),
            self.accounts.calls().many.len(),
            self.devices.calls().many.len(),
        )
    }
}

fn completed(outcome: CycleOutcome) -> CycleReport {
    match outcome {
        CycleOutcome::Completed(report) => report,
        other => panic!("expected a completed cycle, got {other:?}"),
    }
}

#[test]
fn one_cycle_resolves_each_entity_type_once() {
    let w = World::new();
    let detector = w.detector();
    let a = w.tx("p1", "p2");
    let b = w.tx("p1", "p2");
    // p2 holds 5 and sends 10.
    let c = w.tx("p2", "p1");
    w.queue.extend([a.clone(), b.clone(), c.clone()]);

    let report = completed(detector.run_cycle().unwrap());
    assert_eq!(report.fetched, 3);
    assert_eq!((report.verified, report.rejected, report.persisted), (2, 1, 3));
    assert_eq!((report.identities, report.accounts, report.devices), (2, 2, 1));
    assert_eq!(report.batch_digest.len(), 64);

    assert_eq!(w.many_calls(), (1, 1, 1));
    assert_eq!(w.identities.calls().many[0], vec!["p1".to_string(), "p2".to_string()]);
    assert_eq!(w.devices.calls().many[0], vec!["m1".to_string()]);
    assert_eq!(w.identities.calls().one, 0);

    let verified = w.sink.verify_calls();
    let rejected = w.sink.reject_calls();
    assert_eq!(verified.len(), 1);
    assert_eq!(rejected.len(), 1);
    assert_eq!(verified[0].len(), 2);
    assert!(verified[0].iter().all(|t| t.legitimate == Some(true)));
    assert_eq!(rejected[0], vec![c.clone().classified(false)]);

    assert_eq!(w.store.len(), 3);
    assert_eq!(w.store.save_calls(), 1);
    assert_eq!(w.store.get(&a.id).unwrap().legitimate, Some(true));
    assert_eq!(w.store.get(&c.id).unwrap().legitimate, Some(false));
    assert_eq!(detector.processor().phase(), CyclePhase::Idle);
}

#[test]
fn second_cycle_is_served_from_cache() {
    let w = World::new();
    let detector = w.detector();
    w.queue.push(w.tx("p1", "p2"));
    completed(detector.run_cycle().unwrap());

    w.queue.push(w.tx("p1", "p2"));
    completed(detector.run_cycle().unwrap());
    assert_eq!(w.many_calls(), (1, 1, 1));
    assert!(detector.resolvers().identities.cache_stats().hits >= 2);
}

#[test]
fn a_rejection_taints_the_next_minute() {
    let w = World::new();
    let detector = w.detector();
    w.queue.push(w.tx("p2", "p1"));
    let first = completed(detector.run_cycle().unwrap());
    assert_eq!(first.rejected, 1);

    // Affordable this time, but the rejection above is still in the window.
    let mut small = w.tx("p2", "p1");
    small.amount = Decimal::ONE;
    w.queue.push(small.clone());
    w.clock.advance(TimeDelta::seconds(30));
    let second = completed(detector.run_cycle().unwrap());
    assert_eq!(second.rejected, 1);

    // Both stored rejections carry the original timestamp, so 61 s on the
    // sender is clean again.
    let mut later = small;
    later.id = TransactionId::new();
    w.queue.push(later);
    w.clock.advance(TimeDelta::seconds(31));
    let third = completed(detector.run_cycle().unwrap());
    assert_eq!(third.verified, 1);
}

#[test]
fn ten_transactions_in_one_batch_see_no_shared_history() {
    let w = World::new();
    let detector = w.detector();
    w.queue.extend((0..10).map(|_| w.tx("p1", "p2")));
    let report = completed(detector.run_cycle().unwrap());
    assert_eq!(report.verified, 10);

    // The next one from p1 now sees ten inside the burst window.
    w.queue.push(w.tx("p1", "p2"));
    let report = completed(detector.run_cycle().unwrap());
    assert_eq!(report.rejected, 1);
}

#[test]
fn warm_up_preloads_every_cache() {
    let w = World::new();
    w.store
        .save_all(&[
            Transaction::dummy("p1", "p2", "m1", w.now - TimeDelta::seconds(120)).classified(true),
        ])
        .unwrap();
    let detector = w.detector();

    let warm = detector.warm();
    assert_eq!(warm.transactions, 1);
    assert_eq!((warm.identities, warm.accounts, warm.devices), (2, 2, 1));
    assert_eq!(w.many_calls(), (1, 1, 1));

    w.queue.push(w.tx("p1", "p2"));
    completed(detector.run_cycle().unwrap());
    assert_eq!(w.many_calls(), (1, 1, 1));
}

#[test]
fn missing_entities_reject_only_their_transactions() {
    let w = World::new();
    let detector = w.detector();
    w.queue.push(w.tx("p1", "p2"));
    w.queue.push(w.tx("p1", "ghost"));

    let report = completed(detector.run_cycle().unwrap());
    assert_eq!((report.verified, report.rejected), (1, 1));
    assert_eq!(report.identities, 2);
    assert_eq!(w.sink.reject_calls()[0][0].recipient, "ghost");
}

#[test]
fn batch_size_bounds_each_fetch() {
    let w = World::new();
    let config = DetectorConfig {
        batch_size: 2,
        ..DetectorConfig::default()
    };
    let detector = Detector::new(config, w.collaborators()).unwrap();
    w.queue.extend((0..5).map(|_| w.tx("p1", "p2")));

    assert_eq!(completed(detector.run_cycle().unwrap()).fetched, 2);
    assert_eq!(completed(detector.run_cycle().unwrap()).fetched, 2);
    assert_eq!(completed(detector.run_cycle().unwrap()).fetched, 1);
    assert_eq!(detector.run_cycle().unwrap(), CycleOutcome::Idle);
}

#[test]
fn persist_failure_aborts_after_dispatch() {
    let w = World::new();
    let detector = w.detector();
    w.store.set_failing_saves(true);
    w.queue.push(w.tx("p1", "p2"));

    let err = detector.run_cycle().unwrap_err();
    assert!(matches!(
        err,
        FraudError::CycleAborted {
            phase: CyclePhase::Persist,
            ..
        }
    ));
    assert_eq!(w.sink.verify_calls().len(), 1);
    assert!(w.store.is_empty());
    assert_eq!(detector.processor().phase(), CyclePhase::Idle);
}

#[test]
fn dispatch_failure_persists_nothing() {
    let w = World::new();
    let detector = w.detector();
    w.sink.set_failing(true);
    w.queue.push(w.tx("p1", "p2"));

    let err = detector.run_cycle().unwrap_err();
    assert!(matches!(
        err,
        FraudError::CycleAborted {
            phase: CyclePhase::Dispatch,
            ..
        }
    ));
    assert_eq!(w.store.save_calls(), 0);
}

#[test]
fn remote_failure_aborts_in_prefetch() {
    let w = World::new();
    let detector = w.detector();
    w.accounts.set_failing(true);
    w.queue.push(w.tx("p1", "p2"));

    let err = detector.run_cycle().unwrap_err();
    assert!(matches!(
        err,
        FraudError::CycleAborted {
            phase: CyclePhase::Prefetch,
            ..
        }
    ));
    assert!(w.sink.verify_calls().is_empty());
    assert!(w.sink.reject_calls().is_empty());

    // The next cycle starts clean once the service recovers.
    w.accounts.set_failing(false);
    w.queue.push(w.tx("p1", "p2"));
    assert_eq!(completed(detector.run_cycle().unwrap()).verified, 1);
}

/// Source that parks inside FETCH until released.
struct GatedSource {
    entered: Barrier,
    release: Barrier,
}

impl UnverifiedSource for GatedSource {
    fn pull_unverified(&self, _limit: usize) -> Result<Vec<Transaction>> {
        self.entered.wait();
        self.release.wait();
        Ok(Vec::new())
    }
}

#[test]
fn overlapping_cycles_are_skipped() {
    let w = World::new();
    let gate = Arc::new(GatedSource {
        entered: Barrier::new(2),
        release: Barrier::new(2),
    });
    let detector = Arc::new(
        Detector::new(
            DetectorConfig::default(),
            Collaborators {
                source: gate.clone(),
                ..w.collaborators()
            },
        )
        .unwrap(),
    );

    let running = {
        let detector = Arc::clone(&detector);
        thread::spawn(move || detector.run_cycle())
    };
    gate.entered.wait();
    assert_eq!(detector.processor().phase(), CyclePhase::Fetch);
    assert_eq!(detector.run_cycle().unwrap(), CycleOutcome::Skipped);
    gate.release.wait();

    assert_eq!(running.join().unwrap().unwrap(), CycleOutcome::Idle);
    assert_eq!(detector.processor().last_cycle(), CycleId(1));
}
