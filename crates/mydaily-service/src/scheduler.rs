//! Periodic sweep driver.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::triggers::Triggers;

/// Shortest accepted sweep period.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Calls `Triggers::on_scheduled_tick` on a fixed period.
pub struct SweepScheduler {
    triggers: Arc<Triggers>,
    interval: Duration,
}

impl SweepScheduler {
    /// Create a scheduler. Periods under one second are raised to one second.
    #[must_use]
    pub fn new(triggers: Arc<Triggers>, interval: Duration) -> Self {
        Self {
            triggers,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Tick until `shutdown` resolves. The first sweep runs immediately.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(interval_secs = self.interval.as_secs(), "Sweep scheduler started");

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Sweep scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.triggers.on_scheduled_tick().await;
                    if report.processed > 0 {
                        tracing::debug!(?report, "Scheduled sweep finished");
                    }
                }
            }
        }
    }
}
