//! Time source for the request pipeline.

use std::time::Instant;

/// Source of monotonic timestamps handed to the governor.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock for tests. Clones share the same time.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MockClock {
    current: std::sync::Arc<parking_lot::Mutex<Instant>>,
}

#[cfg(test)]
impl MockClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current: std::sync::Arc::new(parking_lot::Mutex::new(start)),
        }
    }

    pub fn advance(&self, duration: std::time::Duration) {
        *self.current.lock() += duration;
    }
}

#[cfg(test)]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}
