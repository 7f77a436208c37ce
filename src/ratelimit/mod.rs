//! Per-key rate limiting logic and state management.

mod backend;
mod clock;
mod eviction;
mod governor;
mod record;
mod sweeper;

pub use backend::RateLimitBackend;
pub use clock::{Clock, SystemClock};
pub use eviction::EvictionPolicy;
pub use governor::{LimitConfig, RateGovernor, DEFAULT_LIMIT, DEFAULT_WINDOW};
pub use record::{UsageRecord, Verdict};
pub use sweeper::run_sweeper;

#[cfg(test)]
pub(crate) use clock::MockClock;
