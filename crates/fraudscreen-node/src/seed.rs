//! Synthetic data for the demo node.
//!
//! Generates a population of identities with accounts and devices, a slice
//! of recent classified history for the warmer to find, and a queue of
//! unverified transactions. A small share of every population is flagged so
//! each rule has something to reject.

use chrono::{DateTime, TimeDelta, Utc};
use fraudscreen_pipeline::memory::{
    InMemoryEntityService, InMemoryQueue, InMemoryTransactionStore,
};
use fraudscreen_types::{Account, Device, Identity, Result, Transaction, TransactionId, TransactionStore};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;

/// Sizes of the generated world.
#[derive(Debug, Clone, Copy)]
pub struct SeedPlan {
    pub identities: usize,
    pub devices: usize,
    pub history: usize,
    pub pending: usize,
    pub seed: u64,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            identities: 50,
            devices: 20,
            history: 200,
            pending: 500,
            seed: 7,
        }
    }
}

pub struct World {
    pub identities: InMemoryEntityService<Identity>,
    pub accounts: InMemoryEntityService<Account>,
    pub devices: InMemoryEntityService<Device>,
    pub store: InMemoryTransactionStore,
    pub queue: InMemoryQueue,
}

fn person(i: usize) -> String {
    format!("P{i:05}")
}

fn account_of(code: &str) -> String {
    format!("ACC-{code}")
}

fn mac(i: usize) -> String {
    format!("02:00:00:00:{:02x}:{:02x}", (i >> 8) & 0xff, i & 0xff)
}

/// Build a world according to `plan`, anchored at `now`.
pub fn generate(plan: SeedPlan, now: DateTime<Utc>) -> Result<World> {
    let mut rng = StdRng::seed_from_u64(plan.seed);
    let people = plan.identities.max(2);
    let devices = plan.devices.max(1);

    let identities = InMemoryEntityService::new();
    let accounts = InMemoryEntityService::new();
    for i in 0..people {
        let code = person(i);
        identities.insert(Identity {
            code: code.clone(),
            warrant_issued: rng.gen_bool(0.02),
            has_contract: !rng.gen_bool(0.02),
            blacklisted: rng.gen_bool(0.02),
        });
        accounts.insert(Account {
            number: account_of(&code),
            owner: code,
            closed: rng.gen_bool(0.02),
            balance: Decimal::new(rng.gen_range(0..500_000), 2),
        });
    }

    let device_service = InMemoryEntityService::new();
    for i in 0..devices {
        device_service.insert(Device {
            mac: mac(i),
            blacklisted: rng.gen_bool(0.05),
        });
    }

    let transfer = |rng: &mut StdRng, at: DateTime<Utc>| {
        let sender = rng.gen_range(0..people);
        let mut recipient = rng.gen_range(0..people - 1);
        if recipient >= sender {
            recipient += 1;
        }
        let sender = person(sender);
        let recipient = person(recipient);
        Transaction {
            id: TransactionId::new(),
            sender_account: account_of(&sender),
            recipient_account: account_of(&recipient),
            sender,
            recipient,
            device_mac: mac(rng.gen_range(0..devices)),
            amount: Decimal::new(rng.gen_range(100..200_000), 2),
            timestamp: at,
            legitimate: None,
        }
    };

    let store = InMemoryTransactionStore::new();
    let history: Vec<Transaction> = (0..plan.history)
        .map(|_| {
            let at = now - TimeDelta::seconds(rng.gen_range(60..600));
            let legitimate = !rng.gen_bool(0.1);
            transfer(&mut rng, at).classified(legitimate)
        })
        .collect();
    store.save_all(&history)?;

    let queue = InMemoryQueue::new();
    queue.extend((0..plan.pending).map(|_| {
        let at = now - TimeDelta::milliseconds(rng.gen_range(0..5_000));
        transfer(&mut rng, at)
    }));

    Ok(World {
        identities,
        accounts,
        devices: device_service,
        store,
        queue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_sizes_are_honoured() {
        let plan = SeedPlan {
            identities: 10,
            devices: 3,
            history: 25,
            pending: 40,
            seed: 1,
        };
        let world = generate(plan, Utc::now()).unwrap();
        assert_eq!(world.identities.len(), 10);
        assert_eq!(world.accounts.len(), 10);
        assert_eq!(world.devices.len(), 3);
        assert_eq!(world.store.len(), 25);
        assert_eq!(world.queue.len(), 40);
    }

    #[test]
    fn every_pending_transaction_references_known_entities() {
        use fraudscreen_types::{EntityService, UnverifiedSource};

        let world = generate(SeedPlan::default(), Utc::now()).unwrap();
        for tx in world.queue.pull_unverified(usize::MAX).unwrap() {
            assert_ne!(tx.sender, tx.recipient);
            assert!(!tx.is_classified());
            assert!(world.identities.get_one(&tx.sender).is_ok());
            assert!(world.accounts.get_one(&tx.recipient_account).is_ok());
            assert!(world.devices.get_one(&tx.device_mac).is_ok());
        }
    }
}
