//! Document storage layer for mydaily.
//!
//! This crate provides persistent storage for users, habit records and the
//! two shapes of aggregation record used by the notification pipeline.
//!
//! # Architecture
//!
//! The storage uses the following collections:
//!
//! - `users`: provisioned users, keyed by `user_id`
//! - `habits`: per-day habit records, keyed by `{date}_{user_id}`
//! - `queued_notifications`: time-windowed queue, keyed by `{date}_{user_id}`
//! - `pending_notifications`: pending-merge records, keyed by `user_id`
//! - `pending_versions`: last version issued per user, kept across deletes
//!
//! Two backends implement [`Store`]: [`MemoryStore`] (default) and
//! `RocksStore`, available with the `rocksdb-backend` feature.
//!
//! # Example
//!
//! ```
//! use mydaily_core::{User, UserId};
//! use mydaily_store::{MemoryStore, Store};
//!
//! # async fn example() -> mydaily_store::Result<()> {
//! let store = MemoryStore::new();
//! store.put_user(&User::new(UserId::from_ordinal(1), 1)).await?;
//! store
//!     .set_push_token(&UserId::from_ordinal(1), Some("device-token".into()))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use mydaily_core::{
    HabitKey, HabitRecord, HabitSet, PendingNotification, QueuedNotification, User, UserId,
};

/// The storage trait defining all document operations.
///
/// This trait abstracts the document store, allowing for different
/// implementations (e.g., `RocksDB`, in-memory for testing).
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert or replace a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_user(&self, user: &User) -> Result<()>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// List all users ordered by display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Replace a user's push token. The previous token is discarded.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn set_push_token(&self, user_id: &UserId, token: Option<String>) -> Result<()>;

    // =========================================================================
    // Habit Record Operations
    // =========================================================================

    /// Get the record of a user for a day.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_habit_record(
        &self,
        date: NaiveDate,
        user_id: &UserId,
    ) -> Result<Option<HabitRecord>>;

    /// Upsert a habit record and return the snapshot it replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_habit_record(&self, record: &HabitRecord) -> Result<Option<HabitRecord>>;

    /// Toggle one habit of a user's day in a single step, creating the
    /// record if needed. Returns the replaced snapshot and the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn toggle_habit(
        &self,
        date: NaiveDate,
        user_id: &UserId,
        habit: HabitKey,
        updated_at: DateTime<Utc>,
    ) -> Result<(Option<HabitRecord>, HabitRecord)>;

    /// List records with `from <= date <= to`, ordered by date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_habit_records(&self, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<HabitRecord>>;

    // =========================================================================
    // Queued Notification Operations (time-windowed queue)
    // =========================================================================

    /// Union `habits` into the `(date, user)` queue entry, creating it if
    /// needed, and stamp `queued_at`.
    ///
    /// This is a plain upsert: two concurrent callers may each read the old
    /// set on backends without server-side set union.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn union_queued(
        &self,
        user_id: &UserId,
        date: NaiveDate,
        habits: &HabitSet,
        queued_at: DateTime<Utc>,
    ) -> Result<QueuedNotification>;

    /// List queue entries with `queued_at <= cutoff`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_queued_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<QueuedNotification>>;

    /// Delete a queue entry. Deleting a missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_queued(&self, date: NaiveDate, user_id: &UserId) -> Result<()>;

    // =========================================================================
    // Pending Notification Operations (pending-merge)
    // =========================================================================

    /// Get the pending record of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_pending(&self, user_id: &UserId) -> Result<Option<PendingNotification>>;

    /// Write a pending record if the stored version still matches.
    ///
    /// `expected_version` is `None` to create a record that must not exist
    /// yet, or the version read earlier. Returns the new version.
    ///
    /// Versions only grow per user, including across deletes, so a writer
    /// holding a version read before a delete can never match a record
    /// created after it.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict` if another writer got there first.
    /// - Any database error.
    async fn put_pending(
        &self,
        record: &PendingNotification,
        expected_version: Option<u64>,
    ) -> Result<u64>;

    /// List all pending records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_pending(&self) -> Result<Vec<PendingNotification>>;

    /// Delete a user's pending record if it is still at `version`.
    ///
    /// Returns `false` and leaves the record alone when a newer version was
    /// written since it was read, or when there is nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_pending_if(&self, user_id: &UserId, version: u64) -> Result<bool>;
}
