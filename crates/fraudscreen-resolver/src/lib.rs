//! # fraudscreen-resolver
//!
//! **Entity resolution plane**: everything between the pipeline and the
//! rate-limited identity, account and device services.
//!
//! ## Architecture
//!
//! 1. **RequestCoalescer**: single-flight execution per key
//! 2. **EntityCache**: TTL + capacity-bounded cache-aside store, one per entity type
//! 3. **BatchEntityResolver**: `single()` through cache + coalescer,
//!    `batch()` through cache + one remote call for the missing subset
//! 4. **CacheWarmer**: pre-populates the resolvers from recent history at startup
//!
//! ## Lookup Flow
//!
//! ```text
//! single(k): cache hit ─────────────────────────────────────→ entity
//!            cache miss → coalescer(k) → get_one(k) → cache → entity
//! batch(ks): cache hits ∪ get_many(missing ks) → cache → entities
//! ```
//!
//! Caches and the coalescer registry are the only shared mutable state;
//! they are built once at startup and shared by `Arc`.

pub mod coalescer;
pub mod entity_cache;
pub mod resolver;
pub mod warmer;

pub use coalescer::RequestCoalescer;
pub use entity_cache::{CacheStats, EntityCache};
pub use resolver::{BatchEntityResolver, Resolvers};
pub use warmer::{CacheWarmer, KeySets, WarmReport};
