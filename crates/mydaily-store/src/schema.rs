//! Collection definitions.
//!
//! Collections map to column families in `RocksDB` storage and to separate
//! maps in the in-memory backend.

/// Collection names.
pub mod cf {
    /// Provisioned users, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Habit records, keyed by `{date}_{user_id}`.
    pub const HABITS: &str = "habits";

    /// Time-windowed notification queue, keyed by `{date}_{user_id}`.
    pub const QUEUED_NOTIFICATIONS: &str = "queued_notifications";

    /// Pending-merge notification records, keyed by `user_id`.
    pub const PENDING_NOTIFICATIONS: &str = "pending_notifications";

    /// Last pending-record version issued, keyed by `user_id`. Survives the
    /// record's deletion.
    pub const PENDING_VERSIONS: &str = "pending_versions";
}

/// Returns all collection names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::HABITS,
        cf::QUEUED_NOTIFICATIONS,
        cf::PENDING_NOTIFICATIONS,
        cf::PENDING_VERSIONS,
    ]
}
