//! Classification result for a single transaction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleFailure {
    SenderIdentity,
    RecipientIdentity,
    Device,
    SenderAccount,
    RecipientAccount,
    /// Too many sender transactions in the burst window.
    Burst,
    /// Sender used more than one device in the device window.
    MultiDevice,
    /// Sender has a rejected transaction in the history window.
    TaintedHistory,
}

impl fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SenderIdentity => write!(f, "SENDER_IDENTITY"),
            Self::RecipientIdentity => write!(f, "RECIPIENT_IDENTITY"),
            Self::Device => write!(f, "DEVICE"),
            Self::SenderAccount => write!(f, "SENDER_ACCOUNT"),
            Self::RecipientAccount => write!(f, "RECIPIENT_ACCOUNT"),
            Self::Burst => write!(f, "BURST"),
            Self::MultiDevice => write!(f, "MULTI_DEVICE"),
            Self::TaintedHistory => write!(f, "TAINTED_HISTORY"),
        }
    }
}

/// Conjunction of every check for one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Every check that failed, in evaluation order.
    pub failures: Vec<RuleFailure>,
}

impl Verdict {
    /// Record a check outcome. All checks are recorded; nothing short-circuits.
    pub fn check(&mut self, passed: bool, failure: RuleFailure) {
        if !passed {
            self.failures.push(failure);
        }
    }

    #[must_use]
    pub fn is_legitimate(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn failed(&self, failure: RuleFailure) -> bool {
        self.failures.contains(&failure)
    }
}
