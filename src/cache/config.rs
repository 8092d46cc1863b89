//! Query cache configuration.

use std::time::Duration;

const DEFAULT_KEEP_UNUSED_FOR_SECS: u64 = 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry with no subscribers is retained before eviction.
    /// Zero evicts as soon as the last subscriber leaves.
    pub keep_unused_for: Duration,
    /// Cadence of the background eviction sweeper.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_for: Duration::from_secs(DEFAULT_KEEP_UNUSED_FOR_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            keep_unused_for: settings.keep_unused_for,
            sweep_interval: settings.sweep_interval,
        }
    }
}

impl CacheConfig {
    /// Config that evicts entries the moment their last subscriber leaves.
    pub fn evict_immediately() -> Self {
        Self {
            keep_unused_for: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Sweep interval clamped to one millisecond, as timers reject zero periods.
    pub fn sweep_interval_non_zero(&self) -> Duration {
        self.sweep_interval.max(Duration::from_millis(1))
    }
}
