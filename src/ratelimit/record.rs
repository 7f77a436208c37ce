//! Per-key usage record and the verdict returned by a check.

use std::time::{Duration, Instant};

/// Usage observed for a single key within its current window.
///
/// `count` is at least 1 once a record has been observed, and
/// `window_start` never moves past the `now` of the call that set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageRecord {
    /// Requests observed in the current window
    pub count: u64,
    /// When the current window began
    pub window_start: Instant,
}

impl UsageRecord {
    /// A record for a key that has not been seen before.
    pub(crate) fn fresh(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    /// Time elapsed since the window began, as seen at `now`.
    ///
    /// A `now` earlier than `window_start` counts as no time elapsed.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.window_start)
    }

    /// Account for one request at `now`.
    ///
    /// The window only moves when a request arrives strictly after the old
    /// window has fully elapsed; a request exactly on the boundary still
    /// counts against the old window. Returns `true` if the window was reset.
    pub(crate) fn observe(&mut self, now: Instant, window: Duration) -> bool {
        if self.elapsed(now) > window {
            self.count = 1;
            self.window_start = now;
            true
        } else {
            self.count = self.count.saturating_add(1);
            false
        }
    }

    /// Time until a request would fall strictly past the current window.
    pub fn time_until_reset(&self, now: Instant, window: Duration) -> Duration {
        let elapsed = self.elapsed(now);
        if elapsed > window {
            Duration::ZERO
        } else {
            window - elapsed + Duration::from_millis(1)
        }
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The request is within quota
    Admit {
        /// Requests still allowed in the current window
        remaining: u64,
    },
    /// The request exceeds the quota for the current window
    Deny {
        /// How long until the key's window resets
        retry_after: Duration,
    },
}

impl Verdict {
    /// Whether the request may proceed.
    pub fn is_admit(&self) -> bool {
        matches!(self, Verdict::Admit { .. })
    }

    /// Whether the request was rejected.
    pub fn is_deny(&self) -> bool {
        matches!(self, Verdict::Deny { .. })
    }
}
