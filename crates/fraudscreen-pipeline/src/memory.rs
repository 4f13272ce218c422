//! In-memory collaborators.
//!
//! Process-local implementations of every port: the three entity services,
//! the transaction store, the unverified queue and the classification sink.
//! The node binary runs on them, and tests use their call records to assert
//! how often the pipeline went remote.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    ops::Bound,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use chrono::{DateTime, Utc};
use fraudscreen_types::{
    ClassificationSink, Entity, EntityService, FraudError, Result, Transaction, TransactionId,
    TransactionStore, UnverifiedSource,
};
use parking_lot::{Mutex, RwLock};

// ---------------------------------------------------------------------------
// Entity services
// ---------------------------------------------------------------------------

/// Snapshot of the calls an [`InMemoryEntityService`] has answered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCalls {
    pub one: usize,
    /// Key list of every `get_many` call, in arrival order.
    pub many: Vec<Vec<String>>,
    pub pages: usize,
}

/// Entity service backed by a map, recording every call.
pub struct InMemoryEntityService<E: Entity> {
    entities: RwLock<HashMap<String, E>>,
    one_calls: AtomicUsize,
    many_calls: Mutex<Vec<Vec<String>>>,
    page_calls: AtomicUsize,
    failing: AtomicBool,
}

impl<E: Entity> Default for InMemoryEntityService<E> {
    fn default() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            one_calls: AtomicUsize::new(0),
            many_calls: Mutex::new(Vec::new()),
            page_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }
}

impl<E: Entity> InMemoryEntityService<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let service = Self::new();
        for entity in entities {
            service.insert(entity);
        }
        service
    }

    pub fn insert(&self, entity: E) {
        self.entities.write().insert(entity.key().to_string(), entity);
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Make every subsequent call fail as a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> ServiceCalls {
        ServiceCalls {
            one: self.one_calls.load(Ordering::SeqCst),
            many: self.many_calls.lock().clone(),
            pages: self.page_calls.load(Ordering::SeqCst),
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FraudError::RemoteService {
                service: E::KIND,
                reason: "service unavailable".into(),
            });
        }
        Ok(())
    }
}

impl<E: Entity> EntityService<E> for InMemoryEntityService<E> {
    fn get_one(&self, key: &str) -> Result<E> {
        self.one_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.entities
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| FraudError::EntityNotFound {
                kind: E::KIND,
                key: key.to_string(),
            })
    }

    fn get_many(&self, keys: &[String]) -> Result<Vec<E>> {
        self.many_calls.lock().push(keys.to_vec());
        self.check_available()?;
        let entities = self.entities.read();
        Ok(keys.iter().filter_map(|k| entities.get(k).cloned()).collect())
    }

    fn get_page(&self, page_number: usize, page_size: usize) -> Result<Vec<E>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let entities = self.entities.read();
        let mut keys: Vec<&String> = entities.keys().collect();
        keys.sort();
        Ok(keys
            .into_iter()
            .skip(page_number.saturating_mul(page_size))
            .take(page_size)
            .filter_map(|k| entities.get(k).cloned())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Transaction store
// ---------------------------------------------------------------------------

type HistoryKey = (String, DateTime<Utc>, TransactionId);

#[derive(Default)]
struct StoreInner {
    /// Rows ordered by `(sender, timestamp, id)` so per-sender windows are range scans.
    by_sender: BTreeMap<HistoryKey, Transaction>,
    /// Where each id currently lives in `by_sender`.
    keys: HashMap<TransactionId, HistoryKey>,
}

/// Transaction store with a composite `(sender, timestamp)` index.
///
/// Saving a transaction whose id already exists replaces the stored row.
#[derive(Default)]
pub struct InMemoryTransactionStore {
    inner: RwLock<StoreInner>,
    save_calls: AtomicUsize,
    failing_saves: AtomicBool,
}

impl InMemoryTransactionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().keys.is_empty()
    }

    pub fn get(&self, id: &TransactionId) -> Option<Transaction> {
        let inner = self.inner.read();
        inner.keys.get(id).and_then(|k| inner.by_sender.get(k)).cloned()
    }

    /// Number of `save_all` calls, successful or not.
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Make `save_all` fail until reset.
    pub fn set_failing_saves(&self, failing: bool) {
        self.failing_saves.store(failing, Ordering::SeqCst);
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn find_by_sender_since(&self, sender: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        // The all-ones id sorts last, so an exclusive bound on it skips every
        // row stamped exactly `since`.
        let lower = (
            sender.to_string(),
            since,
            TransactionId::from_bytes([0xff; 16]),
        );
        let inner = self.inner.read();
        Ok(inner
            .by_sender
            .range((Bound::Excluded(lower), Bound::Unbounded))
            .take_while(|((s, _, _), _)| s == sender)
            .map(|(_, tx)| tx.clone())
            .collect())
    }

    fn find_since(&self, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        let inner = self.inner.read();
        Ok(inner
            .by_sender
            .values()
            .filter(|tx| tx.timestamp > since)
            .cloned()
            .collect())
    }

    fn save_all(&self, transactions: &[Transaction]) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_saves.load(Ordering::SeqCst) {
            return Err(FraudError::Persistence {
                reason: "store rejected the write".into(),
            });
        }
        let mut inner = self.inner.write();
        for tx in transactions {
            let key = (tx.sender.clone(), tx.timestamp, tx.id);
            if let Some(old) = inner.keys.insert(tx.id, key.clone()) {
                inner.by_sender.remove(&old);
            }
            inner.by_sender.insert(key, tx.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unverified queue
// ---------------------------------------------------------------------------

/// FIFO of transactions waiting for classification.
#[derive(Default)]
pub struct InMemoryQueue {
    pending: Mutex<VecDeque<Transaction>>,
    failing: AtomicBool,
}

impl InMemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, tx: Transaction) {
        self.pending.lock().push_back(tx);
    }

    pub fn extend(&self, txs: impl IntoIterator<Item = Transaction>) {
        self.pending.lock().extend(txs);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl UnverifiedSource for InMemoryQueue {
    fn pull_unverified(&self, limit: usize) -> Result<Vec<Transaction>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FraudError::SourceUnavailable {
                reason: "queue unreachable".into(),
            });
        }
        let mut pending = self.pending.lock();
        let n = limit.min(pending.len());
        Ok(pending.drain(..n).collect())
    }
}

// ---------------------------------------------------------------------------
// Classification sink
// ---------------------------------------------------------------------------

/// Sink that records every batch it is handed.
#[derive(Default)]
pub struct RecordingSink {
    verified: Mutex<Vec<Vec<Transaction>>>,
    rejected: Mutex<Vec<Vec<Transaction>>>,
    failing: AtomicBool,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `verify` call's batch, in order.
    pub fn verify_calls(&self) -> Vec<Vec<Transaction>> {
        self.verified.lock().clone()
    }

    /// Every `reject` call's batch, in order.
    pub fn reject_calls(&self) -> Vec<Vec<Transaction>> {
        self.rejected.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FraudError::Dispatch {
                reason: "classification service unavailable".into(),
            });
        }
        Ok(())
    }
}

impl ClassificationSink for RecordingSink {
    fn verify(&self, transactions: &[Transaction]) -> Result<()> {
        self.check_available()?;
        self.verified.lock().push(transactions.to_vec());
        Ok(())
    }

    fn reject(&self, transactions: &[Transaction]) -> Result<()> {
        self.check_available()?;
        self.rejected.lock().push(transactions.to_vec());
        Ok(())
    }
}
