//! Sliding-window fraud rules.
//!
//! Each rule looks at the sender's history strictly after `T - window`,
//! where `T` is the evaluation instant:
//!
//! | Rule              | Window | Passes when                          |
//! |-------------------|--------|--------------------------------------|
//! | Burst             | 30 s   | count < 10                           |
//! | Multi-device      | 10 s   | distinct device macs < 2             |
//! | History integrity | 1 min  | every transaction was legitimate     |
//!
//! The history is fetched once for the widest window and narrowed in
//! memory, which yields the same sets as one query per window.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use fraudscreen_types::{RuleConfig, Transaction};

/// What the sender's history looks like inside each rule's window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    /// Transactions inside the burst window.
    pub burst: usize,
    /// Distinct device macs inside the device window.
    pub devices: usize,
    /// Any transaction inside the history window not classified legitimate.
    pub tainted: bool,
}

/// The three window rules with their configured bounds.
#[derive(Debug, Clone)]
pub struct SlidingWindowRules {
    burst_window: TimeDelta,
    burst_limit: usize,
    device_window: TimeDelta,
    device_limit: usize,
    history_window: TimeDelta,
    widest: TimeDelta,
}

impl SlidingWindowRules {
    #[must_use]
    pub fn new(config: &RuleConfig) -> Self {
        Self {
            burst_window: delta(config.burst_window),
            burst_limit: config.burst_limit,
            device_window: delta(config.device_window),
            device_limit: config.device_limit,
            history_window: delta(config.history_window),
            widest: delta(config.widest_window()),
        }
    }

    /// The instant to query history from so every window is covered.
    #[must_use]
    pub fn lookback(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        cutoff(at, self.widest)
    }

    /// Narrow `history` into each rule's window anchored at `at`.
    #[must_use]
    pub fn measure(&self, history: &[Transaction], at: DateTime<Utc>) -> WindowCounts {
        let burst_since = cutoff(at, self.burst_window);
        let device_since = cutoff(at, self.device_window);
        let history_since = cutoff(at, self.history_window);

        let mut counts = WindowCounts::default();
        let mut macs = HashSet::new();
        for tx in history {
            if tx.timestamp > burst_since {
                counts.burst += 1;
            }
            if tx.timestamp > device_since {
                macs.insert(tx.device_mac.as_str());
            }
            if tx.timestamp > history_since && !tx.is_legitimate() {
                counts.tainted = true;
            }
        }
        counts.devices = macs.len();
        counts
    }

    #[must_use]
    pub fn burst_ok(&self, counts: &WindowCounts) -> bool {
        counts.burst < self.burst_limit
    }

    #[must_use]
    pub fn multi_device_ok(&self, counts: &WindowCounts) -> bool {
        counts.devices < self.device_limit
    }

    #[must_use]
    pub fn history_ok(&self, counts: &WindowCounts) -> bool {
        !counts.tainted
    }
}

fn delta(window: std::time::Duration) -> TimeDelta {
    TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX)
}

fn cutoff(at: DateTime<Utc>, window: TimeDelta) -> DateTime<Utc> {
    at.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> SlidingWindowRules {
        SlidingWindowRules::new(&RuleConfig::default())
    }

    fn at(now: DateTime<Utc>, secs_ago: i64, mac: &str, legit: bool) -> Transaction {
        Transaction::dummy("s", "r", mac, now - TimeDelta::seconds(secs_ago)).classified(legit)
    }

    #[test]
    fn burst_threshold_is_strict() {
        let now = Utc::now();
        let r = rules();

        let nine: Vec<_> = (0..9).map(|i| at(now, 20 + i, "m1", true)).collect();
        assert!(r.burst_ok(&r.measure(&nine, now)));

        let ten: Vec<_> = (0..10).map(|i| at(now, 20 + i, "m1", true)).collect();
        let counts = r.measure(&ten, now);
        assert_eq!(counts.burst, 10);
        assert!(!r.burst_ok(&counts));
    }

    #[test]
    fn burst_window_excludes_its_boundary() {
        let now = Utc::now();
        let r = rules();
        let mut txs: Vec<_> = (0..9).map(|i| at(now, i, "m1", true)).collect();
        txs.push(at(now, 30, "m1", true));
        let counts = r.measure(&txs, now);
        assert_eq!(counts.burst, 9);
        assert!(r.burst_ok(&counts));
    }

    #[test]
    fn two_devices_in_ten_seconds_fail() {
        let now = Utc::now();
        let r = rules();

        let one = vec![at(now, 1, "m1", true), at(now, 5, "m1", true)];
        assert!(r.multi_device_ok(&r.measure(&one, now)));

        let two = vec![at(now, 1, "m1", true), at(now, 5, "m2", true)];
        let counts = r.measure(&two, now);
        assert_eq!(counts.devices, 2);
        assert!(!r.multi_device_ok(&counts));
    }

    #[test]
    fn older_devices_do_not_count() {
        let now = Utc::now();
        let r = rules();
        let txs = vec![at(now, 1, "m1", true), at(now, 15, "m2", true)];
        assert!(r.multi_device_ok(&r.measure(&txs, now)));
    }

    #[test]
    fn rejected_transaction_in_last_minute_taints() {
        let now = Utc::now();
        let r = rules();
        let txs = vec![at(now, 5, "m1", true), at(now, 45, "m1", false)];
        assert!(!r.history_ok(&r.measure(&txs, now)));
    }

    #[test]
    fn rejection_older_than_a_minute_is_forgotten() {
        let now = Utc::now();
        let r = rules();
        let txs = vec![at(now, 5, "m1", true), at(now, 61, "m1", false)];
        assert!(r.history_ok(&r.measure(&txs, now)));
    }

    #[test]
    fn empty_history_passes_everything() {
        let now = Utc::now();
        let r = rules();
        let counts = r.measure(&[], now);
        assert!(r.burst_ok(&counts));
        assert!(r.multi_device_ok(&counts));
        assert!(r.history_ok(&counts));
    }

    #[test]
    fn lookback_covers_widest_window() {
        let now = Utc::now();
        assert_eq!(rules().lookback(now), now - TimeDelta::seconds(60));
    }

    #[test]
    fn custom_limits_apply() {
        let now = Utc::now();
        let r = SlidingWindowRules::new(&RuleConfig {
            burst_limit: 3,
            device_limit: 3,
            ..RuleConfig::default()
        });
        let txs = vec![at(now, 1, "m1", true), at(now, 2, "m2", true), at(now, 3, "m1", true)];
        let counts = r.measure(&txs, now);
        assert!(!r.burst_ok(&counts));
        assert!(r.multi_device_ok(&counts));
    }
}
