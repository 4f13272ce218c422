//! # fraudscreen-pipeline
//!
//! **Orchestration plane**: turns the resolver and validation crates into a
//! running screening loop.
//!
//! ## Architecture
//!
//! 1. **BatchProcessor**: one cycle = FETCH → PREFETCH → VALIDATE → DISPATCH → PERSIST
//! 2. **Detector**: wires collaborators, resolvers, warmer and processor from one config
//! 3. **Scheduler**: warms once, then runs cycles with a fixed delay on a dedicated thread
//! 4. **memory**: in-memory collaborators (entity services, store, queue, sink)
//!
//! ## Cycle Flow
//!
//! ```text
//! pull_unverified(N) → Resolvers::batch ×3 → ValidationContext
//!     → ValidationEngine::evaluate (per tx) → verify / reject → save_all
//! ```
//!
//! Cycles never overlap: a second caller arriving mid-cycle is turned away
//! with [`CycleOutcome::Skipped`](fraudscreen_types::CycleOutcome::Skipped).

pub mod detector;
pub mod memory;
pub mod processor;
pub mod scheduler;

pub use detector::{Collaborators, Detector};
pub use processor::BatchProcessor;
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerStats};
