//! Configuration types for the fraudscreen pipeline.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{FraudError, Result, constants};

/// Top-level configuration for one detector process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Maximum transactions pulled per cycle.
    pub batch_size: usize,
    /// Fixed delay between the end of one cycle and the start of the next.
    pub cycle_interval: Duration,
    /// How far back the startup cache warmer looks.
    pub warm_window: Duration,
    /// Entity cache sizing (applied to each of the three caches).
    pub cache: CacheConfig,
    /// In-flight request coalescing bounds.
    pub coalescer: CoalescerConfig,
    /// Sliding-window rule parameters.
    pub rules: RuleConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            batch_size: constants::DEFAULT_BATCH_SIZE,
            cycle_interval: Duration::from_millis(constants::DEFAULT_CYCLE_INTERVAL_MS),
            warm_window: Duration::from_secs(constants::DEFAULT_WARM_WINDOW_SECS),
            cache: CacheConfig::default(),
            coalescer: CoalescerConfig::default(),
            rules: RuleConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| FraudError::Configuration(format!("invalid config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(FraudError::Configuration("batch_size must be > 0".into()));
        }
        if self.cache.capacity == 0 {
            return Err(FraudError::Configuration("cache.capacity must be > 0".into()));
        }
        if self.cache.ttl.is_zero() {
            return Err(FraudError::Configuration("cache.ttl must be > 0".into()));
        }
        if self.coalescer.wait_timeout.is_zero() || self.coalescer.stale_after.is_zero() {
            return Err(FraudError::Configuration(
                "coalescer bounds must be > 0".into(),
            ));
        }
        self.rules.validate()
    }
}

/// Sizing for one entity cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Expire-after-write.
    pub ttl: Duration,
    /// Maximum entries before least-recently-used eviction.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(constants::DEFAULT_CACHE_TTL_SECS),
            capacity: constants::DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Bounds on in-flight request coalescing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoalescerConfig {
    /// Registry entries older than this are treated as leaked and replaced.
    pub stale_after: Duration,
    /// Longest a caller waits on another caller's in-flight request.
    pub wait_timeout: Duration,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(constants::DEFAULT_FLIGHT_STALE_SECS),
            wait_timeout: Duration::from_millis(constants::DEFAULT_FLIGHT_WAIT_TIMEOUT_MS),
        }
    }
}

/// Parameters for the three sliding-window rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub burst_window: Duration,
    /// Sender passes while its burst-window count is below this.
    pub burst_limit: usize,
    pub device_window: Duration,
    /// Sender passes while its distinct device count is below this.
    pub device_limit: usize,
    pub history_window: Duration,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            burst_window: Duration::from_secs(constants::DEFAULT_BURST_WINDOW_SECS),
            burst_limit: constants::DEFAULT_BURST_LIMIT,
            device_window: Duration::from_secs(constants::DEFAULT_DEVICE_WINDOW_SECS),
            device_limit: constants::DEFAULT_DEVICE_LIMIT,
            history_window: Duration::from_secs(constants::DEFAULT_HISTORY_WINDOW_SECS),
        }
    }
}

impl RuleConfig {
    /// The longest look-back any rule needs.
    #[must_use]
    pub fn widest_window(&self) -> Duration {
        self.burst_window
            .max(self.device_window)
            .max(self.history_window)
    }

    pub fn validate(&self) -> Result<()> {
        if self.burst_window.is_zero()
            || self.device_window.is_zero()
            || self.history_window.is_zero()
        {
            return Err(FraudError::Configuration("rule windows must be > 0".into()));
        }
        if self.burst_limit == 0 || self.device_limit == 0 {
            return Err(FraudError::Configuration("rule limits must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = DetectorConfig::default();
        assert_eq!(cfg.batch_size, 100);
        assert_eq!(cfg.cache.ttl.as_secs(), 30);
        assert_eq!(cfg.cache.capacity, 10_000);
        assert_eq!(cfg.warm_window.as_secs(), 600);
        assert_eq!(cfg.rules.burst_limit, 10);
        assert_eq!(cfg.rules.device_limit, 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn widest_window_is_history() {
        assert_eq!(RuleConfig::default().widest_window().as_secs(), 60);
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = DetectorConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back = DetectorConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn partial_json_takes_defaults() {
        let cfg = DetectorConfig::from_json_str(r#"{"batch_size": 25}"#).unwrap();
        assert_eq!(cfg.batch_size, 25);
        assert_eq!(cfg.rules, RuleConfig::default());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let err = DetectorConfig::from_json_str(r#"{"batch_size": 0}"#).unwrap_err();
        assert!(matches!(err, FraudError::Configuration(_)));
    }

    #[test]
    fn malformed_json_rejected() {
        let err = DetectorConfig::from_json_str("{batch_size").unwrap_err();
        assert!(matches!(err, FraudError::Configuration(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = DetectorConfig::from_file("/nonexistent/fraudscreen.json").unwrap_err();
        assert!(matches!(err, FraudError::Io(_)));
    }
}
