//! System-wide constants for the fraudscreen pipeline.

/// Maximum unverified transactions pulled per cycle.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Fixed delay between the end of one cycle and the start of the next (ms).
pub const DEFAULT_CYCLE_INTERVAL_MS: u64 = 1000;

/// Look-back used by the cache warmer at startup (seconds).
pub const DEFAULT_WARM_WINDOW_SECS: u64 = 600;

/// Entity cache expire-after-write (seconds).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

/// Entity cache capacity per entity type.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Age after which an in-flight coalesced request is considered leaked (seconds).
pub const DEFAULT_FLIGHT_STALE_SECS: u64 = 30;

/// Upper bound on how long a waiter blocks on another caller's flight (ms).
pub const DEFAULT_FLIGHT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Burst rule look-back (seconds).
pub const DEFAULT_BURST_WINDOW_SECS: u64 = 30;

/// Burst rule: a sender passes while its windowed count stays below this.
pub const DEFAULT_BURST_LIMIT: usize = 10;

/// Multi-device rule look-back (seconds).
pub const DEFAULT_DEVICE_WINDOW_SECS: u64 = 10;

/// Multi-device rule: a sender passes while its distinct device count stays below this.
pub const DEFAULT_DEVICE_LIMIT: usize = 2;

/// History-integrity rule look-back (seconds).
pub const DEFAULT_HISTORY_WINDOW_SECS: u64 = 60;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "fraudscreen";
