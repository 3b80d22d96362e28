//! Key encoding utilities.
//!
//! Per-day keys start with the ISO date so that byte order is date order,
//! which lets range scans over `habits` start at the first requested day.

use chrono::NaiveDate;
use mydaily_core::{habit_record_id, UserId};

/// Create a user key from a user ID.
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_str().as_bytes().to_vec()
}

/// Create a habit record key: `{date}_{user_id}`.
#[must_use]
pub fn habit_record_key(date: NaiveDate, user_id: &UserId) -> Vec<u8> {
    habit_record_id(date, user_id).into_bytes()
}

/// The smallest key that can belong to `date`.
#[must_use]
pub fn date_prefix(date: NaiveDate) -> Vec<u8> {
    date.format("%Y-%m-%d").to_string().into_bytes()
}

/// Create a queue entry key: `{date}_{user_id}`.
#[must_use]
pub fn queued_key(date: NaiveDate, user_id: &UserId) -> Vec<u8> {
    habit_record_key(date, user_id)
}

/// Create a pending record key from a user ID.
#[must_use]
pub fn pending_key(user_id: &UserId) -> Vec<u8> {
    user_key(user_id)
}
