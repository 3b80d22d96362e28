//! Activation aggregation.
//!
//! Three policies decide what happens to a detected activation:
//!
//! - `Immediate` fans out right away, one notification per write
//! - `Windowed` unions it into a per-`(date, user)` queue entry that the
//!   sweep sends once it is old enough
//! - `Pending` merges it into a per-user pending record under an optimistic
//!   version check; the sweep sends whatever has accumulated

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;

use mydaily_core::{HabitSet, PendingNotification, QueuedNotification, UserId};
use mydaily_store::Store;

use crate::error::NotifyError;
use crate::fanout::{DeliveryReport, FanoutSender};
use crate::recipients::recipient_tokens;

/// How activations are held before fanout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationPolicy {
    /// Send on every activating write.
    Immediate,
    /// Queue per `(date, user)`; sweep after a minimum delay.
    Windowed,
    /// Merge per user; sweep everything on each tick.
    #[default]
    Pending,
}

impl AggregationPolicy {
    /// Lowercase name used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Windowed => "windowed",
            Self::Pending => "pending",
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "windowed" => Ok(Self::Windowed),
            "pending" => Ok(Self::Pending),
            other => Err(format!("unknown aggregation policy: {other}")),
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an aggregation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateOutcome {
    /// Fanned out immediately.
    Sent(DeliveryReport),
    /// Unioned into a queue entry.
    Queued(QueuedNotification),
    /// Merged into the user's pending record.
    Merged {
        /// The stored record, with its new version.
        record: PendingNotification,
        /// Attempts used, starting at 1.
        attempts: u32,
    },
    /// Every merge attempt hit a conflict; the activation was dropped.
    Dropped {
        /// Attempts used.
        attempts: u32,
    },
}

/// Applies the configured policy to activations.
pub struct Aggregator {
    store: Arc<dyn Store>,
    fanout: FanoutSender,
    clock: Arc<dyn Clock + Send + Sync>,
    policy: AggregationPolicy,
    max_attempts: u32,
}

impl Aggregator {
    /// Create an aggregator.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        fanout: FanoutSender,
        clock: Arc<dyn Clock + Send + Sync>,
        policy: AggregationPolicy,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            fanout,
            clock,
            policy,
            max_attempts: max_attempts.max(1),
        }
    }

    /// The active policy.
    #[must_use]
    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Record or send `habits` activated by `user_id` on `date`.
    pub async fn aggregate(
        &self,
        user_id: &UserId,
        date: NaiveDate,
        habits: &HabitSet,
    ) -> Result<AggregateOutcome, NotifyError> {
        match self.policy {
            AggregationPolicy::Immediate => self.send_now(user_id, habits).await,
            AggregationPolicy::Windowed => {
                let entry = self
                    .store
                    .union_queued(user_id, date, habits, self.clock.utc())
                    .await?;
                tracing::debug!(
                    user_id = %user_id,
                    date = %date,
                    habits = entry.habits.len(),
                    "Queued activation"
                );
                Ok(AggregateOutcome::Queued(entry))
            }
            AggregationPolicy::Pending => self.merge_pending(user_id, habits).await,
        }
    }

    async fn send_now(
        &self,
        user_id: &UserId,
        habits: &HabitSet,
    ) -> Result<AggregateOutcome, NotifyError> {
        let users = self.store.list_users().await?;
        let activating = users
            .iter()
            .find(|user| &user.id == user_id)
            .ok_or_else(|| NotifyError::UserNotFound(user_id.clone()))?;

        let tokens = recipient_tokens(&users, user_id);
        let report = self.fanout.send(activating, habits, &tokens).await;
        Ok(AggregateOutcome::Sent(report))
    }

    async fn merge_pending(
        &self,
        user_id: &UserId,
        habits: &HabitSet,
    ) -> Result<AggregateOutcome, NotifyError> {
        for attempt in 1..=self.max_attempts {
            let now = self.clock.utc();
            let current = self.store.get_pending(user_id).await?;
            let (record, expected) = match &current {
                Some(existing) => (existing.merged(habits, now), Some(existing.version)),
                None => (PendingNotification::new(user_id.clone(), habits.clone(), now), None),
            };

            match self.store.put_pending(&record, expected).await {
                Ok(version) => {
                    tracing::debug!(
                        user_id = %user_id,
                        version,
                        attempt,
                        habits = record.habits.len(),
                        "Merged pending activation"
                    );
                    return Ok(AggregateOutcome::Merged {
                        record: PendingNotification { version, ..record },
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_conflict() => {
                    tracing::debug!(user_id = %user_id, attempt, "Pending record changed, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            user_id = %user_id,
            attempts = self.max_attempts,
            "Dropping activation after repeated write conflicts"
        );
        Ok(AggregateOutcome::Dropped {
            attempts: self.max_attempts,
        })
    }
}
