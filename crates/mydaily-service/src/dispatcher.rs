//! Scheduled dispatch of aggregated activations.
//!
//! One sweep drains both aggregation collections so that records written
//! under a previous policy are still delivered:
//!
//! - queue entries older than the minimum delay
//! - every pending record
//!
//! Each record is sent at most once per sweep and then deleted, whatever
//! the delivery outcome. A pending record is only deleted at the version the
//! sweep sent; if a merge landed in between, the newer record stays for the
//! next sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

use mydaily_core::{HabitSet, User, UserId};
use mydaily_store::{Store, StoreError};

use crate::error::NotifyError;
use crate::fanout::FanoutSender;
use crate::recipients::recipient_tokens;

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SweepReport {
    /// Records examined.
    pub processed: usize,
    /// Records that produced a multicast.
    pub notified: usize,
    /// Records that could not be deleted and will be retried.
    pub failed: usize,
}

/// Drains queued and pending activations.
pub struct Dispatcher {
    store: Arc<dyn Store>,
    fanout: FanoutSender,
    clock: Arc<dyn Clock + Send + Sync>,
    queue_min_delay: Duration,
}

impl Dispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        fanout: FanoutSender,
        clock: Arc<dyn Clock + Send + Sync>,
        queue_min_delay: Duration,
    ) -> Self {
        Self {
            store,
            fanout,
            clock,
            queue_min_delay,
        }
    }

    /// Latest `queued_at` that is old enough to send.
    fn queue_cutoff(&self) -> DateTime<Utc> {
        let now = self.clock.utc();
        TimeDelta::from_std(self.queue_min_delay)
            .ok()
            .and_then(|delay| now.checked_sub_signed(delay))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Run one sweep.
    ///
    /// Fails only when the collections cannot be listed; per-record
    /// problems are logged and counted.
    pub async fn run_sweep(&self) -> Result<SweepReport, NotifyError> {
        let queued = self.store.list_queued_before(self.queue_cutoff()).await?;
        let pending = self.store.list_pending().await?;

        if queued.is_empty() && pending.is_empty() {
            tracing::debug!("Nothing to dispatch");
            return Ok(SweepReport::default());
        }

        let users = self.store.list_users().await?;
        let mut report = SweepReport::default();

        for entry in queued {
            let notified = self.dispatch(&users, &entry.user_id, &entry.habits).await;
            let deleted = self.store.delete_queued(entry.date, &entry.user_id).await;
            record(&mut report, notified, deleted, &entry.user_id);
        }

        for entry in pending {
            let notified = self.dispatch(&users, &entry.user_id, &entry.habits).await;
            let deleted = self
                .store
                .delete_pending_if(&entry.user_id, entry.version)
                .await
                .map(|removed| {
                    if !removed {
                        tracing::debug!(
                            user_id = %entry.user_id,
                            version = entry.version,
                            "Pending record grew during the sweep, keeping it"
                        );
                    }
                });
            record(&mut report, notified, deleted, &entry.user_id);
        }

        tracing::info!(
            processed = report.processed,
            notified = report.notified,
            failed = report.failed,
            "Sweep complete"
        );
        Ok(report)
    }

    /// Send one record's notification. Returns whether a multicast was made.
    async fn dispatch(&self, users: &[User], user_id: &UserId, habits: &HabitSet) -> bool {
        if habits.is_empty() {
            tracing::debug!(user_id = %user_id, "Empty record, deleting without sending");
            return false;
        }

        let Some(activating) = users.iter().find(|user| &user.id == user_id) else {
            tracing::warn!(user_id = %user_id, "Activating user no longer exists, dropping record");
            return false;
        };

        let tokens = recipient_tokens(users, user_id);
        let delivery = self.fanout.send(activating, habits, &tokens).await;
        !delivery.is_empty()
    }
}

fn record(
    report: &mut SweepReport,
    notified: bool,
    deleted: Result<(), StoreError>,
    user_id: &UserId,
) {
    report.processed += 1;
    if notified {
        report.notified += 1;
    }
    if let Err(e) = deleted {
        tracing::error!(user_id = %user_id, error = %e, "Failed to delete dispatched record");
        report.failed += 1;
    }
}
