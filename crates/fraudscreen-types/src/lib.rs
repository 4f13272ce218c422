//! # fraudscreen-types
//!
//! Shared types, errors, and configuration for the **fraudscreen** pipeline.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`TransactionId`], [`CycleId`]
//! - **Reference entities**: [`Identity`], [`Account`], [`Device`] and the [`Entity`] trait
//! - **Transaction model**: [`Transaction`]
//! - **Cycle model**: [`CyclePhase`], [`CycleReport`], [`CycleOutcome`]
//! - **Validation model**: [`ValidationContext`], [`Verdict`], [`RuleFailure`]
//! - **Collaborator contracts**: [`EntityService`], [`TransactionStore`],
//!   [`UnverifiedSource`], [`ClassificationSink`], [`Clock`]
//! - **Configuration**: [`DetectorConfig`], [`CacheConfig`], [`CoalescerConfig`], [`RuleConfig`]
//! - **Errors**: [`FraudError`] with `FS_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod clock;
pub mod config;
pub mod constants;
pub mod context;
pub mod cycle;
pub mod entity;
pub mod error;
pub mod ids;
pub mod ports;
pub mod transaction;
pub mod verdict;

// Re-export all primary types at crate root for ergonomic imports:
//   use fraudscreen_types::{Transaction, Identity, FraudError, ...};

pub use clock::*;
pub use config::*;
pub use context::*;
pub use cycle::*;
pub use entity::*;
pub use error::*;
pub use ids::*;
pub use ports::*;
pub use transaction::*;
pub use verdict::*;

// Constants are accessed via `fraudscreen_types::constants::FOO`
// (not re-exported to avoid name collisions).
