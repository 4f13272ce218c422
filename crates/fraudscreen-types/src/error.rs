//! Error types for the fraudscreen pipeline.
//!
//! All errors use the `FS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Entity resolution / remote service errors
//! - 2xx: Transaction store and upstream source errors
//! - 3xx: Downstream dispatch errors
//! - 4xx: Cycle errors
//! - 5xx: Cache warming errors
//! - 9xx: General / internal errors
//!
//! [`FraudError`] is `Clone` because a single coalesced failure is handed to
//! every caller waiting on the same key.

use thiserror::Error;

use crate::{CyclePhase, EntityKind};

/// Central error enum for all fraudscreen operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FraudError {
    // =================================================================
    // Entity Resolution Errors (1xx)
    // =================================================================
    /// The remote service has no entity under this key.
    #[error("FS_ERR_100: {kind} not found: {key}")]
    EntityNotFound { kind: EntityKind, key: String },

    /// Network or server failure talking to a remote entity service.
    #[error("FS_ERR_101: Remote {service} service failed: {reason}")]
    RemoteService { service: EntityKind, reason: String },

    /// A waiter gave up on another caller's in-flight request.
    #[error("FS_ERR_102: Timed out after {waited_ms}ms waiting for in-flight request {key}")]
    CoalescedWaitTimeout { key: String, waited_ms: u64 },

    /// The caller executing an in-flight request unwound before completing it.
    #[error("FS_ERR_103: In-flight request abandoned: {key}")]
    FlightAbandoned { key: String },

    // =================================================================
    // Store / Source Errors (2xx)
    // =================================================================
    /// Bulk write of classified transactions failed.
    #[error("FS_ERR_200: Persistence failed: {reason}")]
    Persistence { reason: String },

    /// Reading sender history failed.
    #[error("FS_ERR_201: History query failed: {reason}")]
    HistoryQuery { reason: String },

    /// The upstream unverified-transaction source could not be read.
    #[error("FS_ERR_202: Unverified source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    // =================================================================
    // Dispatch Errors (3xx)
    // =================================================================
    /// The downstream classification service rejected a verify/reject call.
    #[error("FS_ERR_300: Dispatch failed: {reason}")]
    Dispatch { reason: String },

    // =================================================================
    // Cycle Errors (4xx)
    // =================================================================
    /// A processing cycle stopped during the named phase.
    #[error("FS_ERR_400: Cycle aborted during {phase}: {reason}")]
    CycleAborted { phase: CyclePhase, reason: String },

    // =================================================================
    // Cache Warming Errors (5xx)
    // =================================================================
    /// Warm-up failed. Logged and suppressed by the warmer.
    #[error("FS_ERR_500: Cache warming failed: {reason}")]
    CacheWarming { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("FS_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("FS_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, out-of-range values, etc.).
    #[error("FS_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("FS_ERR_903: I/O error: {0}")]
    Io(String),
}

impl FraudError {
    /// Wrap this error as the cause of an aborted cycle.
    #[must_use]
    pub fn in_phase(self, phase: CyclePhase) -> Self {
        match self {
            already @ Self::CycleAborted { .. } => already,
            other => Self::CycleAborted {
                phase,
                reason: other.to_string(),
            },
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, FraudError>;

// Conversion from std::io::Error
impl From<std::io::Error> for FraudError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FraudError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
