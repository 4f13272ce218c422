//! Per-cycle validation context.
//!
//! Built once during PREFETCH from the batch's distinct keys, read-only for
//! the rest of the cycle, dropped when the cycle ends. There is no context
//! that outlives a cycle.

use std::collections::HashMap;

use crate::{Account, Device, Entity, Identity};

/// Immutable key → entity lookup for all three entity types.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    identities: HashMap<String, Identity>,
    accounts: HashMap<String, Account>,
    devices: HashMap<String, Device>,
}

impl ValidationContext {
    /// Index resolved entities by their keys.
    #[must_use]
    pub fn new(identities: Vec<Identity>, accounts: Vec<Account>, devices: Vec<Device>) -> Self {
        Self {
            identities: index(identities),
            accounts: index(accounts),
            devices: index(devices),
        }
    }

    #[must_use]
    pub fn identity(&self, code: &str) -> Option<&Identity> {
        self.identities.get(code)
    }

    #[must_use]
    pub fn account(&self, number: &str) -> Option<&Account> {
        self.accounts.get(number)
    }

    #[must_use]
    pub fn device(&self, mac: &str) -> Option<&Device> {
        self.devices.get(mac)
    }

    #[must_use]
    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

fn index<E: Entity>(entities: Vec<E>) -> HashMap<String, E> {
    entities
        .into_iter()
        .map(|e| (e.key().to_string(), e))
        .collect()
}
