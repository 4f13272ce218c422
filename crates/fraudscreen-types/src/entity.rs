//! Reference entities owned by the remote identity, account and device services.
//!
//! These are read-only snapshots. Caches and resolvers are generic over the
//! [`Entity`] trait, which exposes the key each remote service indexes by.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which remote service an entity comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Identity,
    Account,
    Device,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::Account => write!(f, "account"),
            Self::Device => write!(f, "device"),
        }
    }
}

/// A keyed snapshot that can be cached and resolved.
pub trait Entity: Clone + Send + Sync + 'static {
    /// The service this entity type is fetched from.
    const KIND: EntityKind;

    /// The key the remote service indexes this entity by.
    fn key(&self) -> &str;
}

/// A person known to the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub code: String,
    pub warrant_issued: bool,
    pub has_contract: bool,
    pub blacklisted: bool,
}

impl Entity for Identity {
    const KIND: EntityKind = EntityKind::Identity;

    fn key(&self) -> &str {
        &self.code
    }
}

/// A bank account known to the account service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub number: String,
    /// Identity code of the account holder.
    pub owner: String,
    pub closed: bool,
    pub balance: Decimal,
}

impl Entity for Account {
    const KIND: EntityKind = EntityKind::Account;

    fn key(&self) -> &str {
        &self.number
    }
}

/// A client device known to the device service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub mac: String,
    pub blacklisted: bool,
}

impl Entity for Device {
    const KIND: EntityKind = EntityKind::Device;

    fn key(&self) -> &str {
        &self.mac
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Identity {
    /// An identity that passes every identity check.
    pub fn clean(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            warrant_issued: false,
            has_contract: true,
            blacklisted: false,
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Account {
    /// An open account owned by `owner` with the given balance.
    pub fn open(number: impl Into<String>, owner: impl Into<String>, balance: Decimal) -> Self {
        Self {
            number: number.into(),
            owner: owner.into(),
            closed: false,
            balance,
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Device {
    /// A device that is not blacklisted.
    pub fn clean(mac: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            blacklisted: false,
        }
    }
}
