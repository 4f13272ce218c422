//! # fraudscreen-validation
//!
//! **Validation plane**: decides whether a single transaction is legitimate.
//!
//! ## Architecture
//!
//! 1. **FraudHistoryIndex**: sender history by time window, read from the store
//! 2. **checks**: cheap field predicates over the prefetched entities
//! 3. **rules**: the three sliding-window rules (burst, multi-device, history integrity)
//! 4. **ValidationEngine**: runs every check and rule and AND-s them into a [`Verdict`]
//!
//! ## Evaluation
//!
//! ```text
//! tx, ctx ─→ checks(ctx)          ─┐
//!          └→ history(sender, T-w) ─→ rules ─→ Verdict
//! ```
//!
//! The engine never touches remote entity services: everything it needs
//! about identities, accounts and devices is in the [`ValidationContext`].
//!
//! [`Verdict`]: fraudscreen_types::Verdict
//! [`ValidationContext`]: fraudscreen_types::ValidationContext

pub mod checks;
pub mod engine;
pub mod history;
pub mod rules;

pub use engine::ValidationEngine;
pub use history::FraudHistoryIndex;
pub use rules::{SlidingWindowRules, WindowCounts};
