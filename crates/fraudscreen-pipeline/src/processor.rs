//! Batch processor: one screening cycle end to end.
//!
//! A cycle pulls up to `batch_size` unverified transactions and walks them
//! through the phases in [`CyclePhase`] order:
//!
//! 1. **FETCH**: pull from the unverified source. Empty means idle.
//! 2. **PREFETCH**: collect the distinct identity, account and device keys
//!    and resolve each set with one `batch` call, the three concurrently.
//! 3. **VALIDATE**: classify every transaction against the shared context.
//! 4. **DISPATCH**: one `verify` call and one `reject` call, each skipped
//!    when its set is empty.
//! 5. **PERSIST**: one bulk write of every classified transaction.
//!
//! Any phase error aborts the cycle as [`FraudError::CycleAborted`]. Nothing
//! is carried over; unpersisted transactions are the source's to redeliver.

use std::{
    sync::Arc,
    thread::{self, ScopedJoinHandle},
    time::Instant,
};

use fraudscreen_resolver::{KeySets, Resolvers};
use fraudscreen_types::{
    ClassificationSink, CycleId, CycleOutcome, CyclePhase, CycleReport, EntityKind, FraudError,
    Result, Transaction, TransactionStore, UnverifiedSource, ValidationContext,
};
use fraudscreen_validation::ValidationEngine;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};

/// Drives screening cycles. At most one cycle runs at a time.
pub struct BatchProcessor {
    source: Arc<dyn UnverifiedSource>,
    sink: Arc<dyn ClassificationSink>,
    store: Arc<dyn TransactionStore>,
    resolvers: Resolvers,
    engine: ValidationEngine,
    batch_size: usize,
    /// Held for the whole cycle; `try_lock` turns overlapping callers away.
    running: Mutex<()>,
    phase: RwLock<CyclePhase>,
    last_cycle: Mutex<CycleId>,
}

impl BatchProcessor {
    #[must_use]
    pub fn new(
        source: Arc<dyn UnverifiedSource>,
        sink: Arc<dyn ClassificationSink>,
        store: Arc<dyn TransactionStore>,
        resolvers: Resolvers,
        engine: ValidationEngine,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            sink,
            store,
            resolvers,
            engine,
            batch_size,
            running: Mutex::new(()),
            phase: RwLock::new(CyclePhase::Idle),
            last_cycle: Mutex::new(CycleId(0)),
        }
    }

    /// The phase the current cycle is in, or `Idle`.
    pub fn phase(&self) -> CyclePhase {
        *self.phase.read()
    }

    /// Id of the most recently started cycle (`cycle:0` before the first).
    pub fn last_cycle(&self) -> CycleId {
        *self.last_cycle.lock()
    }

    /// Run one cycle.
    ///
    /// Returns [`CycleOutcome::Skipped`] without side effects when another
    /// cycle is still running.
    ///
    /// # Errors
    /// [`FraudError::CycleAborted`] naming the phase that failed.
    pub fn run_cycle(&self) -> Result<CycleOutcome> {
        let Some(_running) = self.running.try_lock() else {
            tracing::warn!(phase = %self.phase(), "Previous cycle still running, skipping");
            return Ok(CycleOutcome::Skipped);
        };
        let cycle_id = {
            let mut last = self.last_cycle.lock();
            *last = last.next();
            *last
        };

        let result = self.run_locked(cycle_id);
        *self.phase.write() = CyclePhase::Idle;

        if let Err(err) = &result {
            tracing::error!(cycle = %cycle_id, error = %err, "Cycle aborted");
        }
        result
    }

    fn run_locked(&self, cycle_id: CycleId) -> Result<CycleOutcome> {
        let started = Instant::now();

        let phase = self.advance();
        debug_assert_eq!(phase, CyclePhase::Fetch);
        tracing::info!(cycle = %cycle_id, batch_size = self.batch_size, "Starting to process a batch");
        let batch = self
            .source
            .pull_unverified(self.batch_size)
            .map_err(|e| e.in_phase(phase))?;
        if batch.is_empty() {
            tracing::info!(cycle = %cycle_id, "No transactions to process");
            return Ok(CycleOutcome::Idle);
        }
        let fetched = batch.len();
        let batch_digest = batch_digest(&batch);

        let phase = self.advance();
        let ctx = self.prefetch(&batch).map_err(|e| e.in_phase(phase))?;

        let phase = self.advance();
        let mut classified = Vec::with_capacity(fetched);
        for tx in batch {
            let verdict = self
                .engine
                .evaluate(&tx, &ctx)
                .map_err(|e| e.in_phase(phase))?;
            if verdict.is_legitimate() {
                tracing::info!(tx = %tx.id, "Legitimate transaction");
            } else {
                tracing::info!(tx = %tx.id, failures = ?verdict.failures, "Fraudulent transaction");
            }
            classified.push(tx.classified(verdict.is_legitimate()));
        }
        let (verified, rejected): (Vec<Transaction>, Vec<Transaction>) = classified
            .iter()
            .cloned()
            .partition(Transaction::is_legitimate);

        let phase = self.advance();
        if !verified.is_empty() {
            self.sink.verify(&verified).map_err(|e| e.in_phase(phase))?;
        }
        if !rejected.is_empty() {
            self.sink.reject(&rejected).map_err(|e| e.in_phase(phase))?;
        }

        let phase = self.advance();
        debug_assert_eq!(phase, CyclePhase::Persist);
        if let Err(err) = self.store.save_all(&classified) {
            let dispatched: Vec<String> = classified.iter().map(|t| t.id.to_string()).collect();
            tracing::error!(
                cycle = %cycle_id,
                batch_digest = %batch_digest,
                dispatched = ?dispatched,
                "Classifications were dispatched but not persisted"
            );
            return Err(err.in_phase(phase));
        }

        let report = CycleReport {
            cycle_id,
            fetched,
            verified: verified.len(),
            rejected: rejected.len(),
            persisted: classified.len(),
            identities: ctx.identity_count(),
            accounts: ctx.account_count(),
            devices: ctx.device_count(),
            batch_digest,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            cycle = %cycle_id,
            verified = report.verified,
            rejected = report.rejected,
            elapsed_ms = report.elapsed.as_millis(),
            "Finished processing a batch"
        );
        Ok(CycleOutcome::Completed(report))
    }

    /// Resolve the batch's entities into a context, one `batch` call per type.
    fn prefetch(&self, batch: &[Transaction]) -> Result<ValidationContext> {
        let keys = KeySets::collect(batch);
        tracing::info!(
            identities = keys.identities.len(),
            accounts = keys.accounts.len(),
            devices = keys.devices.len(),
            "Batch fetching entities"
        );

        let (identities, accounts, devices) = thread::scope(|s| {
            let identities = s.spawn(|| self.resolvers.identities.batch(&keys.identities));
            let accounts = s.spawn(|| self.resolvers.accounts.batch(&keys.accounts));
            let devices = self.resolvers.devices.batch(&keys.devices);
            (
                joined(identities, EntityKind::Identity),
                joined(accounts, EntityKind::Account),
                devices,
            )
        });

        Ok(ValidationContext::new(identities?, accounts?, devices?))
    }

    /// Step to the next phase and return it.
    fn advance(&self) -> CyclePhase {
        let mut phase = self.phase.write();
        *phase = phase.next();
        *phase
    }
}

fn joined<T>(handle: ScopedJoinHandle<'_, Result<T>>, kind: EntityKind) -> Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(FraudError::Internal(format!("{kind} resolution panicked"))))
}

/// SHA-256 over the batch's transaction ids in fetch order, hex encoded.
fn batch_digest(batch: &[Transaction]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"fraudscreen:batch:v1:");
    hasher.update((batch.len() as u64).to_le_bytes());
    for tx in batch {
        hasher.update(tx.id.0.as_bytes());
    }
    hex::encode(hasher.finalize())
}
