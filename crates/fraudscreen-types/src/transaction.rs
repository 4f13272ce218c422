//! Transaction model.
//!
//! A transaction arrives unverified (`legitimate == None`) and is classified
//! exactly once. After [`Transaction::classified`] the flag never changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::TransactionId;

/// A money transfer between two identities through two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Identity code of the payer.
    pub sender: String,
    /// Identity code of the payee.
    pub recipient: String,
    pub sender_account: String,
    pub recipient_account: String,
    pub device_mac: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    /// `None` until the pipeline classifies the transaction.
    pub legitimate: Option<bool>,
}

impl Transaction {
    /// Assign the classification. Consumes the unverified value so the
    /// classified transaction is a new, immutable value.
    #[must_use]
    pub fn classified(mut self, legitimate: bool) -> Self {
        debug_assert!(self.legitimate.is_none(), "transaction {} already classified", self.id);
        self.legitimate = Some(legitimate);
        self
    }

    #[must_use]
    pub fn is_classified(&self) -> bool {
        self.legitimate.is_some()
    }

    /// Whether this was classified legitimate. Unclassified counts as not.
    #[must_use]
    pub fn is_legitimate(&self) -> bool {
        self.legitimate == Some(true)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Transaction {
    /// An unverified transaction with derived account numbers
    /// (`ACC-<sender>` / `ACC-<recipient>`) and amount 10.
    pub fn dummy(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        device_mac: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let sender = sender.into();
        let recipient = recipient.into();
        Self {
            id: TransactionId::new(),
            sender_account: format!("ACC-{sender}"),
            recipient_account: format!("ACC-{recipient}"),
            sender,
            recipient,
            device_mac: device_mac.into(),
            amount: Decimal::new(10, 0),
            timestamp,
            legitimate: None,
        }
    }
}
