//! Habit record handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use mydaily_core::{DomainError, HabitKey, HabitRecord, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// Days returned when no range is given.
const DEFAULT_RANGE_DAYS: i64 = 30;

/// Longest accepted range.
const MAX_RANGE_DAYS: i64 = 366;

/// Date range query parameters.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// First day, inclusive (default: 29 days before `to`).
    pub from: Option<NaiveDate>,
    /// Last day, inclusive (default: today, UTC).
    pub to: Option<NaiveDate>,
}

/// Toggle request.
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    /// Habit to toggle.
    pub habit: HabitKey,
}

/// Toggle response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    /// The stored record after the toggle.
    pub record: HabitRecord,
    /// The toggled habit's new count.
    pub count: u32,
}

/// List habit records in a date range.
pub async fn list_habits(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<HabitRecord>>, ApiError> {
    let to = query.to.unwrap_or_else(|| state.clock.utc().date_naive());
    let from = match query.from {
        Some(from) => from,
        None => to
            .checked_sub_signed(TimeDelta::days(DEFAULT_RANGE_DAYS - 1))
            .unwrap_or(NaiveDate::MIN),
    };

    if from > to {
        return Err(ApiError::BadRequest("from must not be after to".into()));
    }
    if (to - from).num_days() >= MAX_RANGE_DAYS {
        return Err(ApiError::BadRequest(format!(
            "range must not exceed {MAX_RANGE_DAYS} days"
        )));
    }

    let records = state.store.list_habit_records(from, to).await?;
    Ok(Json(records))
}

/// Toggle one habit of a user's day, then run the write trigger in the
/// background.
pub async fn toggle_habit(
    State(state): State<Arc<AppState>>,
    Path((date, user_id)): Path<(String, String)>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| DomainError::InvalidDate(date.clone()))?;
    let user_id: UserId = user_id.parse()?;

    if state.store.get_user(&user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("user not found: {user_id}")));
    }

    let (previous, record) = state
        .store
        .toggle_habit(date, &user_id, request.habit, state.clock.utc())
        .await?;
    let count = record.completions.count(request.habit);

    tracing::debug!(
        user_id = %user_id,
        date = %date,
        habit = %request.habit,
        count,
        "Habit toggled"
    );

    let triggers = Arc::clone(&state.triggers);
    let after = record.clone();
    tokio::spawn(async move {
        triggers
            .on_habit_record_write(previous.as_ref(), Some(&after))
            .await;
    });

    Ok(Json(ToggleResponse { record, count }))
}
