//! Cache-aside resolution for one entity type.
//!
//! Two paths share the same cache:
//!
//! - **`single(key)`**: the high-concurrency path. A hit returns without
//!   touching the coalescer. A miss goes through the [`RequestCoalescer`],
//!   so N simultaneous lookups of one cold key cost one remote call.
//! - **`batch(keys)`**: the prefetch path. Hits are served from the cache
//!   and the misses go out in exactly one `get_many` call. The key set is
//!   already deduplicated per call, so it bypasses the coalescer.
//!
//! A batch response that omits requested keys is not an error here: the
//! omitted keys are logged and left out, and whoever builds a context from
//! the result sees them as absent.

use std::{collections::HashSet, sync::Arc};

use fraudscreen_types::{
    Account, CacheConfig, CoalescerConfig, DetectorConfig, Device, Entity, EntityService,
    Identity, Result,
};

use crate::{
    coalescer::RequestCoalescer,
    entity_cache::{CacheStats, EntityCache},
};

/// Resolves one entity type through cache, coalescer and remote service.
pub struct BatchEntityResolver<E: Entity> {
    service: Arc<dyn EntityService<E>>,
    cache: EntityCache<E>,
    coalescer: RequestCoalescer<E>,
}

impl<E: Entity> BatchEntityResolver<E> {
    #[must_use]
    pub fn new(
        service: Arc<dyn EntityService<E>>,
        cache: CacheConfig,
        coalescer: CoalescerConfig,
    ) -> Self {
        Self {
            service,
            cache: EntityCache::new(cache),
            coalescer: RequestCoalescer::new(coalescer),
        }
    }

    /// Resolve one key.
    ///
    /// # Errors
    /// Whatever the remote `get_one` failed with, shared by every caller
    /// that was waiting on the same key.
    pub fn single(&self, key: &str) -> Result<E> {
        if let Some(hit) = self.cache.get(key) {
            return Ok(hit);
        }
        self.coalescer.execute(key, || {
            // A flight for this key may have settled between the miss and
            // winning the registry slot.
            if let Some(hit) = self.cache.peek(key) {
                return Ok(hit);
            }
            tracing::debug!(kind = %E::KIND, key, "Requesting entity");
            let entity = self.service.get_one(key)?;
            // Cached before the flight settles, so anyone arriving after
            // the flight is released hits the cache.
            self.cache.insert(key.to_string(), entity.clone());
            Ok(entity)
        })
    }

    /// Resolve many keys with at most one remote call.
    ///
    /// Returns one entity per resolvable requested key, in no particular
    /// order. Duplicate keys are collapsed.
    pub fn batch(&self, keys: &[String]) -> Result<Vec<E>> {
        let mut seen = HashSet::with_capacity(keys.len());
        let mut resolved = Vec::with_capacity(keys.len());
        let mut missing = Vec::new();

        for key in keys {
            if !seen.insert(key.as_str()) {
                continue;
            }
            match self.cache.get(key) {
                Some(hit) => resolved.push(hit),
                None => missing.push(key.clone()),
            }
        }

        let hits = resolved.len();
        if missing.is_empty() {
            tracing::debug!(kind = %E::KIND, hits, "Batch served from cache");
            return Ok(resolved);
        }

        tracing::debug!(
            kind = %E::KIND,
            hits,
            missing = missing.len(),
            "Requesting missing entities"
        );
        let fetched = self.service.get_many(&missing)?;

        let mut returned = HashSet::with_capacity(fetched.len());
        for entity in fetched {
            returned.insert(entity.key().to_string());
            self.cache.put(entity.clone());
            resolved.push(entity);
        }

        let unresolved: Vec<&String> = missing.iter().filter(|k| !returned.contains(*k)).collect();
        if !unresolved.is_empty() {
            tracing::warn!(
                kind = %E::KIND,
                requested = missing.len(),
                unresolved = ?unresolved,
                "Batch fetch returned fewer entities than requested"
            );
        }

        Ok(resolved)
    }

    /// Fetch one page straight from the service, caching what comes back.
    pub fn page(&self, page_number: usize, page_size: usize) -> Result<Vec<E>> {
        tracing::debug!(kind = %E::KIND, page_number, page_size, "Requesting entity page");
        let entities = self.service.get_page(page_number, page_size)?;
        for entity in &entities {
            self.cache.put(entity.clone());
        }
        Ok(entities)
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Keys with a request currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }

    /// Sweep leaked in-flight entries.
    pub fn purge_stale(&self) -> usize {
        self.coalescer.purge_stale()
    }
}

/// The three resolvers, built once at startup and shared by the warmer
/// and the batch processor.
#[derive(Clone)]
pub struct Resolvers {
    pub identities: Arc<BatchEntityResolver<Identity>>,
    pub accounts: Arc<BatchEntityResolver<Account>>,
    pub devices: Arc<BatchEntityResolver<Device>>,
}

impl Resolvers {
    #[must_use]
    pub fn new(
        identities: Arc<dyn EntityService<Identity>>,
        accounts: Arc<dyn EntityService<Account>>,
        devices: Arc<dyn EntityService<Device>>,
        config: &DetectorConfig,
    ) -> Self {
        Self {
            identities: Arc::new(BatchEntityResolver::new(
                identities,
                config.cache,
                config.coalescer,
            )),
            accounts: Arc::new(BatchEntityResolver::new(
                accounts,
                config.cache,
                config.coalescer,
            )),
            devices: Arc::new(BatchEntityResolver::new(
                devices,
                config.cache,
                config.coalescer,
            )),
        }
    }

    /// Sweep leaked in-flight entries across all three resolvers.
    pub fn purge_stale(&self) -> usize {
        self.identities.purge_stale() + self.accounts.purge_stale() + self.devices.purge_stale()
    }
}
