//! In-memory storage implementation.
//!
//! Every operation takes the collection lock once, so each call is atomic.
//! Nothing is persisted across restarts.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use mydaily_core::{
    habit_record_id, Completions, HabitKey, HabitRecord, HabitSet, PendingNotification,
    QueuedNotification, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Debug, Default)]
struct Collections {
    users: BTreeMap<UserId, User>,
    habits: BTreeMap<String, HabitRecord>,
    queued: BTreeMap<String, QueuedNotification>,
    pending: BTreeMap<UserId, PendingNotification>,
    pending_versions: BTreeMap<UserId, u64>,
}

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn put_user(&self, user: &User) -> Result<()> {
        self.write()?.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self.read()?.users.get(user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| (a.display_order, &a.id).cmp(&(b.display_order, &b.id)));
        Ok(users)
    }

    async fn set_push_token(&self, user_id: &UserId, token: Option<String>) -> Result<()> {
        let mut collections = self.write()?;
        let user = collections
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })?;
        user.fcm_token = token;
        Ok(())
    }

    // =========================================================================
    // Habit Record Operations
    // =========================================================================

    async fn get_habit_record(
        &self,
        date: NaiveDate,
        user_id: &UserId,
    ) -> Result<Option<HabitRecord>> {
        Ok(self
            .read()?
            .habits
            .get(&habit_record_id(date, user_id))
            .cloned())
    }

    async fn put_habit_record(&self, record: &HabitRecord) -> Result<Option<HabitRecord>> {
        Ok(self.write()?.habits.insert(record.id(), record.clone()))
    }

    async fn toggle_habit(
        &self,
        date: NaiveDate,
        user_id: &UserId,
        habit: HabitKey,
        updated_at: DateTime<Utc>,
    ) -> Result<(Option<HabitRecord>, HabitRecord)> {
        let mut collections = self.write()?;
        let key = habit_record_id(date, user_id);
        let previous = collections.habits.get(&key).cloned();

        let completions = previous
            .as_ref()
            .map_or_else(Completions::new, |record| record.completions.clone());
        let record = HabitRecord {
            user_id: user_id.clone(),
            date,
            completions: completions.toggled(habit),
            updated_at: Some(updated_at),
        };
        collections.habits.insert(key, record.clone());
        Ok((previous, record))
    }

    async fn list_habit_records(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HabitRecord>> {
        Ok(self
            .read()?
            .habits
            .values()
            .filter(|record| record.date >= from && record.date <= to)
            .cloned()
            .collect())
    }

    // =========================================================================
    // Queued Notification Operations
    // =========================================================================

    async fn union_queued(
        &self,
        user_id: &UserId,
        date: NaiveDate,
        habits: &HabitSet,
        queued_at: DateTime<Utc>,
    ) -> Result<QueuedNotification> {
        let mut collections = self.write()?;
        let entry = collections
            .queued
            .entry(habit_record_id(date, user_id))
            .or_insert_with(|| QueuedNotification {
                user_id: user_id.clone(),
                date,
                habits: HabitSet::new(),
                queued_at,
            });
        entry.habits.merge(habits);
        entry.queued_at = queued_at;
        Ok(entry.clone())
    }

    async fn list_queued_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<QueuedNotification>> {
        let mut queued: Vec<QueuedNotification> = self
            .read()?
            .queued
            .values()
            .filter(|entry| entry.queued_at <= cutoff)
            .cloned()
            .collect();
        queued.sort_by_key(|entry| entry.queued_at);
        Ok(queued)
    }

    async fn delete_queued(&self, date: NaiveDate, user_id: &UserId) -> Result<()> {
        self.write()?.queued.remove(&habit_record_id(date, user_id));
        Ok(())
    }

    // =========================================================================
    // Pending Notification Operations
    // =========================================================================

    async fn get_pending(&self, user_id: &UserId) -> Result<Option<PendingNotification>> {
        Ok(self.read()?.pending.get(user_id).cloned())
    }

    async fn put_pending(
        &self,
        record: &PendingNotification,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let mut collections = self.write()?;
        let current = collections
            .pending
            .get(&record.user_id)
            .map(|stored| stored.version);

        if current != expected_version {
            tracing::debug!(
                user_id = %record.user_id,
                ?current,
                ?expected_version,
                "Pending version conflict"
            );
            return Err(StoreError::Conflict {
                key: record.user_id.to_string(),
            });
        }

        let issued = collections
            .pending_versions
            .get(&record.user_id)
            .copied()
            .unwrap_or(0);
        let version = issued.max(current.unwrap_or(0)) + 1;

        let mut stored = record.clone();
        stored.version = version;
        collections.pending.insert(record.user_id.clone(), stored);
        collections
            .pending_versions
            .insert(record.user_id.clone(), version);
        Ok(version)
    }

    async fn list_pending(&self) -> Result<Vec<PendingNotification>> {
        Ok(self.read()?.pending.values().cloned().collect())
    }

    async fn delete_pending_if(&self, user_id: &UserId, version: u64) -> Result<bool> {
        let mut collections = self.write()?;
        let current = collections.pending.get(user_id).map(|stored| stored.version);
        if current != Some(version) {
            tracing::debug!(
                user_id = %user_id,
                ?current,
                version,
                "Pending record changed, keeping it"
            );
            return Ok(false);
        }
        collections.pending.remove(user_id);
        Ok(true)
    }
}
