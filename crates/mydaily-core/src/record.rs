//! Stored document types.
//!
//! Field names follow the document store's camelCase convention so the same
//! JSON shape is accepted from change streams and returned by the API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::completions::Completions;
use crate::habit::HabitSet;
use crate::ids::UserId;

/// The identity key of a per-day document: `{date}_{userId}`.
#[must_use]
pub fn habit_record_id(date: NaiveDate, user_id: &UserId) -> String {
    format!("{}_{user_id}", date.format("%Y-%m-%d"))
}

/// One user's completions for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    /// Owner of the record.
    pub user_id: UserId,
    /// Calendar day (no time component).
    pub date: NaiveDate,
    /// Completion values keyed by habit.
    #[serde(default)]
    pub completions: Completions,
    /// Last write time, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl HabitRecord {
    /// Create a record without a write timestamp.
    #[must_use]
    pub fn new(user_id: UserId, date: NaiveDate, completions: Completions) -> Self {
        Self {
            user_id,
            date,
            completions,
            updated_at: None,
        }
    }

    /// The record's identity key.
    #[must_use]
    pub fn id(&self) -> String {
        habit_record_id(self.date, &self.user_id)
    }
}

/// A provisioned user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable user id.
    pub id: UserId,
    /// Ordinal used for sorting and avatar selection.
    pub display_order: u32,
    /// Push registration token of the user's current device.
    #[serde(default)]
    pub fcm_token: Option<String>,
}

impl User {
    /// Create a user without a push registration.
    #[must_use]
    pub fn new(id: UserId, display_order: u32) -> Self {
        Self {
            id,
            display_order,
            fcm_token: None,
        }
    }

    /// The push token, ignoring blank registrations.
    #[must_use]
    pub fn push_token(&self) -> Option<&str> {
        self.fcm_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Activations queued for a `(date, user)` pair, drained once they are old
/// enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedNotification {
    /// The activating user.
    pub user_id: UserId,
    /// Day of the activations.
    pub date: NaiveDate,
    /// Activated habits.
    pub habits: HabitSet,
    /// Time of the most recent merge.
    pub queued_at: DateTime<Utc>,
}

impl QueuedNotification {
    /// The record's identity key.
    #[must_use]
    pub fn id(&self) -> String {
        habit_record_id(self.date, &self.user_id)
    }
}

/// Activations pending for a user, across days, until the next sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingNotification {
    /// The activating user.
    pub user_id: UserId,
    /// Activated habits.
    pub habits: HabitSet,
    /// When the record was first written.
    pub created_at: DateTime<Utc>,
    /// When the record was last merged into.
    pub updated_at: DateTime<Utc>,
    /// Store-assigned revision, bumped on every write.
    #[serde(default)]
    pub version: u64,
}

impl PendingNotification {
    /// A fresh, unsaved record.
    #[must_use]
    pub fn new(user_id: UserId, habits: HabitSet, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            habits,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// This record with `habits` unioned in.
    #[must_use]
    pub fn merged(&self, habits: &HabitSet, now: DateTime<Utc>) -> Self {
        Self {
            user_id: self.user_id.clone(),
            habits: self.habits.union(habits),
            created_at: self.created_at,
            updated_at: now,
            version: self.version,
        }
    }
}
