//! Startup cache warmer.
//!
//! Reads the transactions persisted within the warm window, collects the
//! distinct identity codes, account numbers and device macs they reference,
//! and pushes each key set through its resolver's `batch` path once. The
//! first real cycle then starts with hot caches.
//!
//! Warming is best-effort: any failure is logged and swallowed, never
//! surfaced to the caller.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::TimeDelta;
use fraudscreen_types::{Clock, FraudError, Result, Transaction, TransactionStore};

use crate::resolver::Resolvers;

/// What a warm-up run touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmReport {
    /// Recent transactions the key sets were drawn from.
    pub transactions: usize,
    pub identities: usize,
    pub accounts: usize,
    pub devices: usize,
    /// Set when warming gave up; the process still starts.
    pub failed: bool,
}

/// Pre-populates the three resolvers from recent history.
pub struct CacheWarmer {
    resolvers: Resolvers,
    store: Arc<dyn TransactionStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl CacheWarmer {
    #[must_use]
    pub fn new(
        resolvers: Resolvers,
        store: Arc<dyn TransactionStore>,
        clock: Arc<dyn Clock>,
        window: Duration,
    ) -> Self {
        Self {
            resolvers,
            store,
            clock,
            window,
        }
    }

    /// Warm the caches. Never fails.
    pub fn warm(&self) -> WarmReport {
        tracing::info!(window_secs = self.window.as_secs(), "Starting cache warming");
        match self.try_warm() {
            Ok(report) if report.transactions == 0 => {
                tracing::info!("No recent transactions found for cache warming");
                report
            }
            Ok(report) => {
                tracing::info!(
                    identities = report.identities,
                    accounts = report.accounts,
                    devices = report.devices,
                    transactions = report.transactions,
                    "Cache warming complete"
                );
                report
            }
            Err(err) => {
                tracing::error!(error = %err, "Cache warming failed; continuing with cold caches");
                WarmReport {
                    failed: true,
                    ..WarmReport::default()
                }
            }
        }
    }

    fn try_warm(&self) -> Result<WarmReport> {
        let window = TimeDelta::from_std(self.window)
            .map_err(|e| FraudError::CacheWarming { reason: e.to_string() })?;
        let now = self.clock.now();
        let cutoff = now.checked_sub_signed(window).ok_or_else(|| FraudError::CacheWarming {
            reason: format!("warm window {window} reaches before the representable range"),
        })?;

        let recent = self.store.find_since(cutoff).map_err(|e| FraudError::CacheWarming {
            reason: e.to_string(),
        })?;
        if recent.is_empty() {
            return Ok(WarmReport::default());
        }

        let keys = KeySets::collect(&recent);
        let warm = |e: FraudError| FraudError::CacheWarming { reason: e.to_string() };
        if !keys.identities.is_empty() {
            self.resolvers.identities.batch(&keys.identities).map_err(warm)?;
        }
        if !keys.accounts.is_empty() {
            self.resolvers.accounts.batch(&keys.accounts).map_err(warm)?;
        }
        if !keys.devices.is_empty() {
            self.resolvers.devices.batch(&keys.devices).map_err(warm)?;
        }

        Ok(WarmReport {
            transactions: recent.len(),
            identities: keys.identities.len(),
            accounts: keys.accounts.len(),
            devices: keys.devices.len(),
            failed: false,
        })
    }
}

/// Distinct keys per entity type referenced by a set of transactions.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct KeySets {
    pub identities: Vec<String>,
    pub accounts: Vec<String>,
    pub devices: Vec<String>,
}

impl KeySets {
    /// Sender and recipient identities, sender and recipient accounts, device.
    #[must_use]
    pub fn collect(transactions: &[Transaction]) -> Self {
        let mut identities = BTreeSet::new();
        let mut accounts = BTreeSet::new();
        let mut devices = BTreeSet::new();
        for tx in transactions {
            identities.insert(tx.sender.as_str());
            identities.insert(tx.recipient.as_str());
            accounts.insert(tx.sender_account.as_str());
            accounts.insert(tx.recipient_account.as_str());
            devices.insert(tx.device_mac.as_str());
        }
        Self {
            identities: identities.into_iter().map(str::to_string).collect(),
            accounts: accounts.into_iter().map(str::to_string).collect(),
            devices: devices.into_iter().map(str::to_string).collect(),
        }
    }
}
