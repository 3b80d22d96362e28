//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Read-modify-write operations (set union, toggles, conditional writes and
//! deletes, token replacement) are serialized by a process-wide write lock;
//! plain reads and unconditional deletes go straight to the database.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use mydaily_core::{
    Completions, HabitKey, HabitRecord, HabitSet, PendingNotification, QueuedNotification, User,
    UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::debug!(path = %path.as_ref().display(), "Opened RocksDB store");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(&self, name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_value<T: serde::Serialize>(&self, name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(name)?;
        let value = Self::serialize(value)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn delete_value(&self, name: &str, key: &[u8]) -> Result<()> {
        let cf = self.cf(name)?;
        self.db
            .delete_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn scan<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let cf = self.cf(name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            values.push(Self::deserialize(&value)?);
        }
        Ok(values)
    }
}

#[async_trait]
impl Store for RocksStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn put_user(&self, user: &User) -> Result<()> {
        self.put_value(cf::USERS, &keys::user_key(&user.id), user)
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        self.get_value(cf::USERS, &keys::user_key(user_id))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.scan(cf::USERS)?;
        users.sort_by(|a, b| (a.display_order, &a.id).cmp(&(b.display_order, &b.id)));
        Ok(users)
    }

    async fn set_push_token(&self, user_id: &UserId, token: Option<String>) -> Result<()> {
        let _guard = self.lock()?;
        let key = keys::user_key(user_id);
        let mut user: User = self
            .get_value(cf::USERS, &key)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })?;
        user.fcm_token = token;
        self.put_value(cf::USERS, &key, &user)
    }

    // =========================================================================
    // Habit Record Operations
    // =========================================================================

    async fn get_habit_record(
        &self,
        date: NaiveDate,
        user_id: &UserId,
    ) -> Result<Option<HabitRecord>> {
        self.get_value(cf::HABITS, &keys::habit_record_key(date, user_id))
    }

    async fn put_habit_record(&self, record: &HabitRecord) -> Result<Option<HabitRecord>> {
        let _guard = self.lock()?;
        let key = keys::habit_record_key(record.date, &record.user_id);
        let previous = self.get_value(cf::HABITS, &key)?;
        self.put_value(cf::HABITS, &key, record)?;
        Ok(previous)
    }

    async fn toggle_habit(
        &self,
        date: NaiveDate,
        user_id: &UserId,
        habit: HabitKey,
        updated_at: DateTime<Utc>,
    ) -> Result<(Option<HabitRecord>, HabitRecord)> {
        let _guard = self.lock()?;
        let key = keys::habit_record_key(date, user_id);
        let previous: Option<HabitRecord> = self.get_value(cf::HABITS, &key)?;

        let completions = previous
            .as_ref()
            .map_or_else(Completions::new, |record| record.completions.clone());
        let record = HabitRecord {
            user_id: user_id.clone(),
            date,
            completions: completions.toggled(habit),
            updated_at: Some(updated_at),
        };
        self.put_value(cf::HABITS, &key, &record)?;
        Ok((previous, record))
    }

    async fn list_habit_records(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HabitRecord>> {
        let cf = self.cf(cf::HABITS)?;
        let start = keys::date_prefix(from);
        let mut records = Vec::new();

        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(&start, Direction::Forward))
        {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let record: HabitRecord = Self::deserialize(&value)?;
            if record.date > to {
                break;
            }
            records.push(record);
        }

        Ok(records)
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
        let _guard = self.lock()?;
        let key = keys::queued_key(date, user_id);

        let mut entry = self
            .get_value::<QueuedNotification>(cf::QUEUED_NOTIFICATIONS, &key)?
            .unwrap_or_else(|| QueuedNotification {
                user_id: user_id.clone(),
                date,
                habits: HabitSet::new(),
                queued_at,
            });
        entry.habits.merge(habits);
        entry.queued_at = queued_at;

        self.put_value(cf::QUEUED_NOTIFICATIONS, &key, &entry)?;
        Ok(entry)
    }

    async fn list_queued_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<QueuedNotification>> {
        let mut queued: Vec<QueuedNotification> = self
            .scan::<QueuedNotification>(cf::QUEUED_NOTIFICATIONS)?
            .into_iter()
            .filter(|entry| entry.queued_at <= cutoff)
            .collect();
        queued.sort_by_key(|entry| entry.queued_at);
        Ok(queued)
    }

    async fn delete_queued(&self, date: NaiveDate, user_id: &UserId) -> Result<()> {
        self.delete_value(cf::QUEUED_NOTIFICATIONS, &keys::queued_key(date, user_id))
    }

    // =========================================================================
    // Pending Notification Operations
    // =========================================================================

    async fn get_pending(&self, user_id: &UserId) -> Result<Option<PendingNotification>> {
        self.get_value(cf::PENDING_NOTIFICATIONS, &keys::pending_key(user_id))
    }

    async fn put_pending(
        &self,
        record: &PendingNotification,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let _guard = self.lock()?;
        let key = keys::pending_key(&record.user_id);

        let current = self
            .get_value::<PendingNotification>(cf::PENDING_NOTIFICATIONS, &key)?
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

        let issued: u64 = self.get_value(cf::PENDING_VERSIONS, &key)?.unwrap_or(0);
        let version = issued.max(current.unwrap_or(0)) + 1;

        let mut stored = record.clone();
        stored.version = version;

        let cf_pending = self.cf(cf::PENDING_NOTIFICATIONS)?;
        let cf_versions = self.cf(cf::PENDING_VERSIONS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_pending, &key, Self::serialize(&stored)?);
        batch.put_cf(&cf_versions, &key, Self::serialize(&version)?);
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(version)
    }

    async fn list_pending(&self) -> Result<Vec<PendingNotification>> {
        self.scan(cf::PENDING_NOTIFICATIONS)
    }

    async fn delete_pending_if(&self, user_id: &UserId, version: u64) -> Result<bool> {
        let _guard = self.lock()?;
        let key = keys::pending_key(user_id);

        let current = self
            .get_value::<PendingNotification>(cf::PENDING_NOTIFICATIONS, &key)?
            .map(|stored| stored.version);
        if current != Some(version) {
            tracing::debug!(
                user_id = %user_id,
                ?current,
                version,
                "Pending record changed, keeping it"
            );
            return Ok(false);
        }

        self.delete_value(cf::PENDING_NOTIFICATIONS, &key)?;
        Ok(true)
    }
}
