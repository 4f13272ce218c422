//! Cycle lifecycle types for the batch processor.
//!
//! Each cycle moves through non-overlapping phases:
//! **IDLE → FETCH → PREFETCH → VALIDATE → DISPATCH → PERSIST → IDLE**
//!
//! During FETCH, up to N unverified transactions are pulled.
//! During PREFETCH, the three entity types are resolved into a context.
//! During VALIDATE, each transaction is classified against the context.
//! During DISPATCH, verified and rejected sets are reported downstream.
//! During PERSIST, every classified transaction is written in one bulk call.
//! An empty FETCH returns straight to IDLE.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::CycleId;

/// The phases of a processing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CyclePhase {
    /// No cycle running.
    Idle,
    /// Pulling unverified transactions.
    Fetch,
    /// Resolving identities, accounts and devices for the batch.
    Prefetch,
    /// Classifying each transaction.
    Validate,
    /// Reporting verified / rejected sets downstream.
    Dispatch,
    /// Writing classified transactions to the store.
    Persist,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Fetch => write!(f, "FETCH"),
            Self::Prefetch => write!(f, "PREFETCH"),
            Self::Validate => write!(f, "VALIDATE"),
            Self::Dispatch => write!(f, "DISPATCH"),
            Self::Persist => write!(f, "PERSIST"),
        }
    }
}

impl CyclePhase {
    /// Return the next phase for a non-empty batch.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Fetch,
            Self::Fetch => Self::Prefetch,
            Self::Prefetch => Self::Validate,
            Self::Validate => Self::Dispatch,
            Self::Dispatch => Self::Persist,
            Self::Persist => Self::Idle,
        }
    }
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    /// Transactions pulled in FETCH.
    pub fetched: usize,
    pub verified: usize,
    pub rejected: usize,
    /// Rows written in PERSIST.
    pub persisted: usize,
    /// Distinct entities resolved into the context.
    pub identities: usize,
    pub accounts: usize,
    pub devices: usize,
    /// SHA-256 over the batch's transaction ids, for correlating logs.
    pub batch_digest: String,
    pub elapsed: Duration,
}

/// What a call to the cycle entrypoint did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// FETCH returned nothing.
    Idle,
    /// A full cycle ran.
    Completed(CycleReport),
    /// Another cycle was still running; nothing was done.
    Skipped,
}
