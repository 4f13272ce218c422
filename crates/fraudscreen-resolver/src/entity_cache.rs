//! TTL + capacity-bounded entity cache.
//!
//! Entries expire a fixed time after they were written and are dropped when
//! a read finds them expired. Capacity is enforced by least-recently-used
//! eviction, O(1) per insert.
//!
//! The key space is split across a few shards, each an [`LruCache`] behind
//! its own mutex, so a lookup only contends with callers hashing to the
//! same shard. Recency is tracked per shard; the shard capacities add up to
//! the configured capacity exactly. Small caches use a single shard and so
//! evict in strict global LRU order.

use std::{
    collections::hash_map::RandomState,
    hash::BuildHasher,
    num::NonZeroUsize,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use fraudscreen_types::{CacheConfig, Entity};
use lru::LruCache;
use parking_lot::Mutex;

/// Entries per shard before another shard is added.
const SHARD_SPAN: usize = 1_024;
const MAX_SHARDS: usize = 16;

struct Slot<V> {
    value: V,
    written: Instant,
}

/// Point-in-time counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

impl CacheStats {
    /// Hits over lookups, 0.0 when nothing was looked up yet.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Cache-aside store for one entity type.
pub struct EntityCache<V> {
    shards: Vec<Mutex<LruCache<String, Slot<V>>>>,
    hasher: RandomState,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Entity> EntityCache<V> {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let capacity = config.capacity.max(1);
        let count = (capacity / SHARD_SPAN).clamp(1, MAX_SHARDS);
        let shards = (0..count)
            .map(|i| {
                // Spread the remainder over the first shards.
                let share = capacity / count + usize::from(i < capacity % count);
                Mutex::new(LruCache::new(
                    NonZeroUsize::new(share).unwrap_or(NonZeroUsize::MIN),
                ))
            })
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn shard(&self, key: &str) -> &Mutex<LruCache<String, Slot<V>>> {
        let n = self.shards.len() as u64;
        let idx = usize::try_from(self.hasher.hash_one(key) % n).unwrap_or(0);
        &self.shards[idx]
    }

    /// Look up a live entry and mark it most recently used. Expired entries
    /// are dropped on the way.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut shard = self.shard(key).lock();
        let live = match shard.get(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(slot) if slot.written.elapsed() < self.config.ttl => Some(slot.value.clone()),
            Some(_) => None,
        };

        if live.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            shard.pop(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        live
    }

    /// Look up a live entry without touching recency or the counters.
    pub fn peek(&self, key: &str) -> Option<V> {
        let shard = self.shard(key).lock();
        shard
            .peek(key)
            .filter(|slot| slot.written.elapsed() < self.config.ttl)
            .map(|slot| slot.value.clone())
    }

    /// Store under the entity's own key.
    pub fn put(&self, value: V) {
        let key = value.key().to_string();
        self.insert(key, value);
    }

    /// Store (or replace) an entry, evicting the shard's least recently
    /// used entry when it is full.
    pub fn insert(&self, key: String, value: V) {
        let slot = Slot {
            value,
            written: Instant::now(),
        };
        let mut shard = self.shard(&key).lock();
        // `push` hands back either the replaced entry for this key or the
        // evicted one.
        if let Some((displaced, _)) = shard.push(key.clone(), slot) {
            if displaced != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(kind = %V::KIND, evicted = %displaced, "Cache entry evicted");
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.lock().is_empty())
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}
