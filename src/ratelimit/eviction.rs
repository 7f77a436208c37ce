//! Eviction of stale usage records.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::record::UsageRecord;

/// Policy deciding when a usage record may be dropped from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Records live for the lifetime of the process.
    #[default]
    Never,
    /// Records whose window started more than `idle_windows` windows ago are dropped.
    ///
    /// With `idle_windows >= 1` a dropped record would have been reset on its
    /// next check anyway, so eviction never changes a verdict.
    Idle {
        /// Number of whole windows a record may sit untouched
        idle_windows: u32,
    },
}

impl EvictionPolicy {
    /// Whether this policy ever removes records.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, EvictionPolicy::Never)
    }

    /// Whether `record` is stale at `now` for a limiter with the given window.
    pub fn is_stale(&self, record: &UsageRecord, now: Instant, window: Duration) -> bool {
        match self {
            EvictionPolicy::Never => false,
            EvictionPolicy::Idle { idle_windows } => {
                record.elapsed(now) > window.saturating_mul(*idle_windows)
            }
        }
    }
}
