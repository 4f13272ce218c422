//! Per-transaction validation engine.
//!
//! Evaluates the field checks and the three window rules for one
//! transaction at the instant the clock reports, and AND-s every outcome
//! into a [`Verdict`]. All checks run; none short-circuits, so the verdict
//! lists every reason a transaction was rejected.
//!
//! The transaction under evaluation is not in the store yet, so it never
//! counts against itself.

use std::sync::Arc;

use fraudscreen_types::{
    Clock, Result, RuleConfig, RuleFailure, Transaction, ValidationContext, Verdict,
};

use crate::{checks::FieldChecks, history::FraudHistoryIndex, rules::SlidingWindowRules};

/// Classifies single transactions against a prefetched context.
pub struct ValidationEngine {
    history: FraudHistoryIndex,
    rules: SlidingWindowRules,
    clock: Arc<dyn Clock>,
}

impl ValidationEngine {
    #[must_use]
    pub fn new(history: FraudHistoryIndex, rules: &RuleConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            history,
            rules: SlidingWindowRules::new(rules),
            clock,
        }
    }

    /// Classify `tx`.
    ///
    /// # Errors
    /// [`FraudError::HistoryQuery`](fraudscreen_types::FraudError::HistoryQuery)
    /// when sender history cannot be read. A failed rule is a rejection,
    /// not an error.
    pub fn evaluate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<Verdict> {
        let at = self.clock.now();
        let fields = FieldChecks::evaluate(tx, ctx);

        let history = self
            .history
            .by_sender_since(&tx.sender, self.rules.lookback(at))?;
        let counts = self.rules.measure(&history, at);

        let mut verdict = Verdict::default();
        verdict.check(fields.recipient, RuleFailure::RecipientIdentity);
        verdict.check(fields.sender, RuleFailure::SenderIdentity);
        verdict.check(fields.device, RuleFailure::Device);
        verdict.check(fields.sender_account, RuleFailure::SenderAccount);
        verdict.check(fields.recipient_account, RuleFailure::RecipientAccount);
        verdict.check(self.rules.burst_ok(&counts), RuleFailure::Burst);
        verdict.check(self.rules.multi_device_ok(&counts), RuleFailure::MultiDevice);
        verdict.check(self.rules.history_ok(&counts), RuleFailure::TaintedHistory);

        tracing::debug!(
            tx = %tx.id,
            sender = %tx.sender,
            burst = counts.burst,
            devices = counts.devices,
            tainted = counts.tainted,
            failures = ?verdict.failures,
            "Transaction evaluated"
        );
        Ok(verdict)
    }

    /// Convenience for callers that only need the boolean.
    pub fn is_legitimate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<bool> {
        self.evaluate(tx, ctx).map(|v| v.is_legitimate())
    }
}
