//! Pipeline entry points.
//!
//! `on_habit_record_write` runs after every habit record write and
//! `on_scheduled_tick` runs on the sweep schedule. Neither returns an error:
//! failures are logged and the write or tick is considered handled.

use std::sync::Arc;

use mockable::Clock;
use tokio::sync::Mutex;

use mydaily_core::{detect_record_activations, HabitRecord};
use mydaily_store::Store;

use crate::aggregator::{AggregateOutcome, Aggregator};
use crate::config::PipelineSettings;
use crate::dispatcher::{Dispatcher, SweepReport};
use crate::fanout::FanoutSender;
use crate::transport::PushTransport;

/// What a write trigger did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The record was deleted.
    Deleted,
    /// No habit count increased.
    NoActivation,
    /// The record is dated before today.
    Backfill,
    /// Activations were handed to the aggregator.
    Aggregated(AggregateOutcome),
    /// The aggregator failed; the error was logged.
    Failed,
}

/// The write and tick handlers, wired to one store and transport.
pub struct Triggers {
    aggregator: Aggregator,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock + Send + Sync>,
    skip_backfill: bool,
    sweep_guard: Mutex<()>,
}

impl Triggers {
    /// Wire the pipeline.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn Clock + Send + Sync>,
        settings: &PipelineSettings,
    ) -> Self {
        let fanout = FanoutSender::new(transport);
        Self {
            aggregator: Aggregator::new(
                Arc::clone(&store),
                fanout.clone(),
                Arc::clone(&clock),
                settings.policy,
                settings.max_transaction_attempts,
            ),
            dispatcher: Dispatcher::new(store, fanout, Arc::clone(&clock), settings.queue_min_delay),
            clock,
            skip_backfill: settings.skip_backfill,
            sweep_guard: Mutex::new(()),
        }
    }

    /// The aggregator in use.
    #[must_use]
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Handle one habit record write.
    pub async fn on_habit_record_write(
        &self,
        before: Option<&HabitRecord>,
        after: Option<&HabitRecord>,
    ) -> WriteOutcome {
        let Some(after) = after else {
            return WriteOutcome::Deleted;
        };

        let activated = detect_record_activations(before, Some(after));
        if activated.is_empty() {
            return WriteOutcome::NoActivation;
        }

        if self.skip_backfill {
            let today = self.clock.utc().date_naive();
            if after.date < today {
                tracing::debug!(
                    user_id = %after.user_id,
                    date = %after.date,
                    "Ignoring activation on a past day"
                );
                return WriteOutcome::Backfill;
            }
        }

        tracing::debug!(
            user_id = %after.user_id,
            date = %after.date,
            habits = activated.len(),
            policy = %self.aggregator.policy(),
            "Habits activated"
        );

        match self
            .aggregator
            .aggregate(&after.user_id, after.date, &activated)
            .await
        {
            Ok(outcome) => WriteOutcome::Aggregated(outcome),
            Err(e) => {
                tracing::error!(
                    user_id = %after.user_id,
                    date = %after.date,
                    error = %e,
                    "Failed to aggregate activation"
                );
                WriteOutcome::Failed
            }
        }
    }

    /// Run one sweep unless another is already in flight.
    pub async fn on_scheduled_tick(&self) -> SweepReport {
        let Ok(_guard) = self.sweep_guard.try_lock() else {
            tracing::debug!("Sweep already running, skipping tick");
            return SweepReport::default();
        };

        match self.dispatcher.run_sweep().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Sweep failed");
                SweepReport::default()
            }
        }
    }
}
