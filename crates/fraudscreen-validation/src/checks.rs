//! Entity-field predicates.
//!
//! Plain field checks over the prefetched snapshots. An entity missing from
//! the context fails its check: a transaction is never verified on the
//! strength of data nobody could fetch.

use fraudscreen_types::{Account, Device, Identity, Transaction, ValidationContext};

/// No warrant, has a contract, not blacklisted.
#[must_use]
pub fn identity_ok(identity: Option<&Identity>) -> bool {
    identity.is_some_and(|p| !p.warrant_issued && p.has_contract && !p.blacklisted)
}

#[must_use]
pub fn device_ok(device: Option<&Device>) -> bool {
    device.is_some_and(|d| !d.blacklisted)
}

/// Open, owned by the sender, and covers the amount.
#[must_use]
pub fn sender_account_ok(account: Option<&Account>, tx: &Transaction) -> bool {
    account.is_some_and(|a| !a.closed && a.owner == tx.sender && a.balance >= tx.amount)
}

/// Open and owned by the recipient.
#[must_use]
pub fn recipient_account_ok(account: Option<&Account>, tx: &Transaction) -> bool {
    account.is_some_and(|a| !a.closed && a.owner == tx.recipient)
}

/// Outcome of every field check for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldChecks {
    pub sender: bool,
    pub recipient: bool,
    pub device: bool,
    pub sender_account: bool,
    pub recipient_account: bool,
}

impl FieldChecks {
    #[must_use]
    pub fn evaluate(tx: &Transaction, ctx: &ValidationContext) -> Self {
        Self {
            sender: identity_ok(ctx.identity(&tx.sender)),
            recipient: identity_ok(ctx.identity(&tx.recipient)),
            device: device_ok(ctx.device(&tx.device_mac)),
            sender_account: sender_account_ok(ctx.account(&tx.sender_account), tx),
            recipient_account: recipient_account_ok(ctx.account(&tx.recipient_account), tx),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn tx() -> Transaction {
        Transaction::dummy("p1", "p2", "m1", Utc::now())
    }

    #[test]
    fn identity_flags() {
        assert!(identity_ok(Some(&Identity::clean("p"))));
        let mut warrant = Identity::clean("p");
        warrant.warrant_issued = true;
        assert!(!identity_ok(Some(&warrant)));
        let mut no_contract = Identity::clean("p");
        no_contract.has_contract = false;
        assert!(!identity_ok(Some(&no_contract)));
        let mut listed = Identity::clean("p");
        listed.blacklisted = true;
        assert!(!identity_ok(Some(&listed)));
        assert!(!identity_ok(None));
    }

    #[test]
    fn sender_account_needs_owner_and_balance() {
        let t = tx();
        assert!(sender_account_ok(Some(&Account::open("ACC-p1", "p1", Decimal::new(10, 0))), &t));
        assert!(!sender_account_ok(Some(&Account::open("ACC-p1", "p1", Decimal::new(9, 0))), &t));
        assert!(!sender_account_ok(Some(&Account::open("ACC-p1", "p9", Decimal::new(99, 0))), &t));
        let mut closed = Account::open("ACC-p1", "p1", Decimal::new(99, 0));
        closed.closed = true;
        assert!(!sender_account_ok(Some(&closed), &t));
    }

    #[test]
    fn recipient_account_ignores_balance() {
        let t = tx();
        assert!(recipient_account_ok(Some(&Account::open("ACC-p2", "p2", Decimal::ZERO)), &t));
        assert!(!recipient_account_ok(Some(&Account::open("ACC-p2", "p1", Decimal::ZERO)), &t));
    }

    #[test]
    fn missing_entities_fail_closed() {
        let checks = FieldChecks::evaluate(&tx(), &ValidationContext::default());
        assert!(!checks.sender);
        assert!(!checks.recipient);
        assert!(!checks.device);
        assert!(!checks.sender_account);
        assert!(!checks.recipient_account);
    }

    #[test]
    fn blacklisted_device() {
        assert!(device_ok(Some(&Device::clean("m"))));
        assert!(!device_ok(Some(&Device {
            mac: "m".into(),
            blacklisted: true
        })));
    }
}
