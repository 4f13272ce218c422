//! Contracts for the external collaborators the pipeline talks to.
//!
//! Transport, authentication and storage internals live behind these traits.
//! All of them are synchronous and shared across threads via `Arc<dyn _>`.

use chrono::{DateTime, Utc};

use crate::{Entity, Result, Transaction};

/// A remote service owning one entity type.
pub trait EntityService<E: Entity>: Send + Sync {
    /// Fetch a single entity.
    ///
    /// # Errors
    /// [`FraudError::EntityNotFound`](crate::FraudError::EntityNotFound) when
    /// the key is unknown, `RemoteService` on transport failure.
    fn get_one(&self, key: &str) -> Result<E>;

    /// Fetch several entities in one call. Returns the resolvable subset.
    fn get_many(&self, keys: &[String]) -> Result<Vec<E>>;

    /// Fetch one page of entities.
    fn get_page(&self, page_number: usize, page_size: usize) -> Result<Vec<E>>;
}

/// Downstream service that receives classification outcomes.
///
/// Both calls are fire-and-forget batch calls; no per-item response is read.
pub trait ClassificationSink: Send + Sync {
    fn verify(&self, transactions: &[Transaction]) -> Result<()>;

    fn reject(&self, transactions: &[Transaction]) -> Result<()>;
}

/// Durable store of classified transactions.
pub trait TransactionStore: Send + Sync {
    /// All transactions from `sender` with `timestamp > since`.
    fn find_by_sender_since(&self, sender: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>>;

    /// All transactions with `timestamp > since`, regardless of sender.
    fn find_since(&self, since: DateTime<Utc>) -> Result<Vec<Transaction>>;

    /// Bulk write.
    fn save_all(&self, transactions: &[Transaction]) -> Result<()>;
}

/// Upstream queue of transactions waiting for classification.
pub trait UnverifiedSource: Send + Sync {
    /// Pull up to `limit` unverified transactions.
    fn pull_unverified(&self, limit: usize) -> Result<Vec<Transaction>>;
}
