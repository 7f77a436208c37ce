//! Background task that periodically evicts stale usage records.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::clock::Clock;
use super::governor::RateGovernor;

/// Run `sweep` on the governor every `period` until `shutdown` resolves.
///
/// Returns immediately when the governor's eviction policy never evicts.
pub async fn run_sweeper<F>(
    governor: Arc<RateGovernor>,
    clock: Arc<dyn Clock>,
    period: Duration,
    shutdown: F,
) where
    F: Future<Output = ()> + Send,
{
    if !governor.eviction().is_enabled() {
        debug!("Eviction disabled, sweeper not started");
        return;
    }

    info!(
        period_ms = period.as_millis() as u64,
        policy = ?governor.eviction(),
        "Starting usage table sweeper"
    );

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Usage table sweeper stopped");
                return;
            }
            _ = ticker.tick() => {
                let removed = governor.sweep(clock.now());
                if removed > 0 {
                    debug!(removed, remaining = governor.len(), "Evicted stale usage records");
                }
            }
        }
    }
}
