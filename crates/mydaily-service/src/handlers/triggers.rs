//! Manual trigger handlers.
//!
//! These run the pipeline entry points on demand, e.g. to replay a change
//! captured elsewhere or to force a sweep.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use mydaily_core::HabitRecord;

use crate::aggregator::AggregateOutcome;
use crate::auth::ServiceAuth;
use crate::dispatcher::SweepReport;
use crate::error::ApiError;
use crate::state::AppState;
use crate::triggers::WriteOutcome;

/// A habit record change.
#[derive(Debug, Deserialize)]
pub struct HabitWriteRequest {
    /// Snapshot before the write; absent for a create.
    #[serde(default)]
    pub before: Option<HabitRecord>,
    /// Snapshot after the write; absent for a delete.
    #[serde(default)]
    pub after: Option<HabitRecord>,
}

/// Summary of a write trigger run.
#[derive(Debug, Serialize)]
pub struct HabitWriteResponse {
    /// `deleted`, `no_activation`, `backfill`, `sent`, `queued`, `merged`,
    /// `dropped` or `failed`.
    pub outcome: &'static str,
    /// Habits now awaiting or included in a notification.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub habits: Vec<String>,
}

impl From<&WriteOutcome> for HabitWriteResponse {
    fn from(outcome: &WriteOutcome) -> Self {
        let (outcome, habits) = match outcome {
            WriteOutcome::Deleted => ("deleted", Vec::new()),
            WriteOutcome::NoActivation => ("no_activation", Vec::new()),
            WriteOutcome::Backfill => ("backfill", Vec::new()),
            WriteOutcome::Failed => ("failed", Vec::new()),
            WriteOutcome::Aggregated(AggregateOutcome::Sent(_)) => ("sent", Vec::new()),
            WriteOutcome::Aggregated(AggregateOutcome::Queued(entry)) => (
                "queued",
                entry.habits.iter().map(|h| h.to_string()).collect(),
            ),
            WriteOutcome::Aggregated(AggregateOutcome::Merged { record, .. }) => (
                "merged",
                record.habits.iter().map(|h| h.to_string()).collect(),
            ),
            WriteOutcome::Aggregated(AggregateOutcome::Dropped { .. }) => ("dropped", Vec::new()),
        };
        Self { outcome, habits }
    }
}

/// Run the write trigger for an explicit change.
pub async fn habit_write(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(request): Json<HabitWriteRequest>,
) -> Result<Json<HabitWriteResponse>, ApiError> {
    tracing::debug!(service = %auth.service_name, "Manual habit-write trigger");

    let outcome = state
        .triggers
        .on_habit_record_write(request.before.as_ref(), request.after.as_ref())
        .await;
    Ok(Json(HabitWriteResponse::from(&outcome)))
}

/// Run one sweep now.
pub async fn tick(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
) -> Result<Json<SweepReport>, ApiError> {
    tracing::debug!(service = %auth.service_name, "Manual sweep trigger");
    Ok(Json(state.triggers.on_scheduled_tick().await))
}
