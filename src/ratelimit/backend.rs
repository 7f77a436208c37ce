//! Rate limiter trait seen by the request pipeline.

use std::time::Instant;

use super::record::Verdict;

/// Trait for rate limiter implementations.
///
/// The HTTP pipeline only talks to the limiter through this trait, so it can
/// be driven by `RateGovernor` or by a stub in tests.
pub trait RateLimitBackend: Send + Sync {
    /// Account for one request from `key` at `now` and decide whether it may proceed.
    fn check(&self, key: &str, now: Instant) -> Verdict;
}
