//! Core per-key rate governor.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::backend::RateLimitBackend;
use super::eviction::EvictionPolicy;
use super::record::{UsageRecord, Verdict};

/// Default number of requests admitted per window.
pub const DEFAULT_LIMIT: u64 = 10;
/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Configuration for a governor, fixed at construction.
#[derive(Debug, Clone)]
pub struct LimitConfig {
    /// Maximum requests admitted per window
    pub limit: u64,
    /// Length of a window
    pub window: Duration,
    /// When stale records may be dropped
    pub eviction: EvictionPolicy,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window: DEFAULT_WINDOW,
            eviction: EvictionPolicy::default(),
        }
    }
}

/// Tracks per-key usage and admits or denies requests against a fixed quota.
///
/// The usage table is a sharded map. Each check runs its read-modify-write
/// while holding the write guard for the key's shard, so concurrent checks
/// for the same key never lose an update.
pub struct RateGovernor {
    table: DashMap<String, UsageRecord>,
    config: LimitConfig,
}

impl RateGovernor {
    /// Create a governor with the given configuration.
    pub fn new(config: LimitConfig) -> Self {
        Self {
            table: DashMap::new(),
            config,
        }
    }

    /// Count one request for `key` at `now` and return the verdict.
    ///
    /// Each call counts as a request, including calls that are denied and
    /// repeated calls with the same `(key, now)`.
    pub fn check(&self, key: &str, now: Instant) -> Verdict {
        let (record, reset) = match self.table.get_mut(key) {
            Some(mut record) => {
                let reset = record.observe(now, self.config.window);
                (*record, reset)
            }
            None => {
                let mut record = self
                    .table
                    .entry(key.to_owned())
                    .or_insert_with(|| UsageRecord::fresh(now));
                let reset = record.observe(now, self.config.window);
                (*record, reset)
            }
        };

        trace!(
            count = record.count,
            limit = self.config.limit,
            "Checked rate limit"
        );
        if reset {
            debug!("Rate limit window reset");
        }

        if record.count > self.config.limit {
            let retry_after = record.time_until_reset(now, self.config.window);
            debug!(
                count = record.count,
                limit = self.config.limit,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            Verdict::Deny { retry_after }
        } else {
            Verdict::Admit {
                remaining: self.config.limit - record.count,
            }
        }
    }

    /// Drop records the eviction policy considers stale at `now`.
    ///
    /// Returns the number of records removed.
    pub fn sweep(&self, now: Instant) -> usize {
        if !self.config.eviction.is_enabled() {
            return 0;
        }

        let before = self.table.len();
        let policy = self.config.eviction;
        let window = self.config.window;
        self.table
            .retain(|_, record| !policy.is_stale(record, now, window));
        before.saturating_sub(self.table.len())
    }

    /// Current usage for a key, if it has been seen.
    pub fn usage(&self, key: &str) -> Option<UsageRecord> {
        self.table.get(key).map(|record| *record)
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no key has been seen yet (or all were cleared or evicted).
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Forget all usage.
    pub fn clear(&self) {
        self.table.clear();
    }

    /// Get the number of requests admitted per window.
    pub fn limit(&self) -> u64 {
        self.config.limit
    }

    /// Get the window length.
    pub fn window(&self) -> Duration {
        self.config.window
    }

    /// Get the eviction policy for stale records.
    pub fn eviction(&self) -> EvictionPolicy {
        self.config.eviction
    }
}

impl Default for RateGovernor {
    fn default() -> Self {
        Self::new(LimitConfig::default())
    }
}

impl RateLimitBackend for RateGovernor {
    fn check(&self, key: &str, now: Instant) -> Verdict {
        RateGovernor::check(self, key, now)
    }
}
