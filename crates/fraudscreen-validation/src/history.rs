//! Sender history lookups for the sliding-window rules.
//!
//! A narrow read-only view over the transaction store: everything a sender
//! did strictly after a given instant. The store is expected to answer this
//! from an index on `(sender, timestamp)`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fraudscreen_types::{FraudError, Result, Transaction, TransactionStore};

/// Time-windowed access to previously classified transactions.
#[derive(Clone)]
pub struct FraudHistoryIndex {
    store: Arc<dyn TransactionStore>,
}

impl FraudHistoryIndex {
    #[must_use]
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// All persisted transactions from `sender` with `timestamp > since`.
    ///
    /// # Errors
    /// [`FraudError::HistoryQuery`] if the store cannot answer.
    pub fn by_sender_since(&self, sender: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        tracing::debug!(sender, since = %since, "Fetching transaction history by sender");
        let mut history = self
            .store
            .find_by_sender_since(sender, since)
            .map_err(|e| match e {
                already @ FraudError::HistoryQuery { .. } => already,
                other => FraudError::HistoryQuery {
                    reason: other.to_string(),
                },
            })?;
        // Enforce the contract even if a store treats the bound inclusively.
        history.retain(|t| t.sender == sender && t.timestamp > since);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    struct Fixed(Vec<Transaction>);

    impl TransactionStore for Fixed {
        fn find_by_sender_since(&self, sender: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
            // Deliberately sloppy: inclusive bound, ignores sender.
            let _ = sender;
            Ok(self.0.iter().filter(|t| t.timestamp >= since).cloned().collect())
        }

        fn find_since(&self, _since: DateTime<Utc>) -> Result<Vec<Transaction>> {
            Ok(self.0.clone())
        }

        fn save_all(&self, _transactions: &[Transaction]) -> Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl TransactionStore for Broken {
        fn find_by_sender_since(&self, _: &str, _: DateTime<Utc>) -> Result<Vec<Transaction>> {
            Err(FraudError::Io("connection refused".into()))
        }

        fn find_since(&self, _: DateTime<Utc>) -> Result<Vec<Transaction>> {
            Err(FraudError::Io("connection refused".into()))
        }

        fn save_all(&self, _: &[Transaction]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn lower_bound_is_exclusive_and_sender_filtered() {
        let now = Utc::now();
        let cutoff = now - TimeDelta::seconds(30);
        let store = Fixed(vec![
            Transaction::dummy("s", "r", "m", cutoff),
            Transaction::dummy("s", "r", "m", cutoff + TimeDelta::milliseconds(1)),
            Transaction::dummy("other", "r", "m", now),
        ]);
        let index = FraudHistoryIndex::new(Arc::new(store));
        let got = index.by_sender_since("s", cutoff).unwrap();
        assert_eq!(got.len(), 1);
        assert!(got[0].timestamp > cutoff);
    }

    #[test]
    fn store_errors_become_history_errors() {
        let index = FraudHistoryIndex::new(Arc::new(Broken));
        let err = index.by_sender_since("s", Utc::now()).unwrap_err();
        assert!(matches!(err, FraudError::HistoryQuery { ref reason } if reason.contains("FS_ERR_903")));
    }
}
