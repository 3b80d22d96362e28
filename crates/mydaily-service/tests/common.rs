//! Common test utilities for mydaily integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use mydaily_core::{
    Completions, HabitKey, HabitRecord, HabitSet, PendingNotification, QueuedNotification, User,
    UserId,
};
use mydaily_service::{
    create_router, AggregationPolicy, AppState, MulticastResponse, Notification, PipelineSettings,
    PushError, PushTransport, ServiceConfig, TokenResult, Triggers,
};
use mydaily_store::{MemoryStore, Store, StoreError};

/// Clock whose time only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = TimeDelta::from_std(delta).expect("duration fits in a TimeDelta");
        *self.0.lock().expect("clock mutex") += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock mutex")
    }
}

/// One recorded multicast.
#[derive(Debug, Clone)]
pub struct SentMulticast {
    pub notification: Notification,
    pub tokens: Vec<String>,
}

/// Transport that records every multicast. Tokens starting with `dead`
/// are rejected as unregistered.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMulticast>>,
    fail_all: Mutex<bool>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<SentMulticast> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_all(&self, fail: bool) {
        *self.fail_all.lock().unwrap() = fail;
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send_multicast(
        &self,
        notification: &Notification,
        tokens: &[String],
    ) -> Result<MulticastResponse, PushError> {
        self.sent.lock().unwrap().push(SentMulticast {
            notification: notification.clone(),
            tokens: tokens.to_vec(),
        });

        if *self.fail_all.lock().unwrap() {
            return Err(PushError::Auth("token endpoint unavailable".into()));
        }

        Ok(MulticastResponse::from_results(
            tokens
                .iter()
                .map(|token| {
                    if token.starts_with("dead") {
                        TokenResult::failed("UNREGISTERED")
                    } else {
                        TokenResult::delivered(format!("projects/demo/messages/{token}"))
                    }
                })
                .collect(),
        ))
    }
}

/// Store that delegates to a `MemoryStore` and can get in the way of the
/// pipeline: rejecting every pending write, or merging more habits into a
/// user's pending record right after the sweep has listed it.
pub struct InterferingStore {
    inner: Arc<MemoryStore>,
    reject_pending_writes: bool,
    merge_after_list: Mutex<Option<(UserId, HabitSet)>>,
}

impl InterferingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            reject_pending_writes: false,
            merge_after_list: Mutex::new(None),
        }
    }

    pub fn rejecting_pending_writes(inner: Arc<MemoryStore>) -> Self {
        Self {
            reject_pending_writes: true,
            ..Self::new(inner)
        }
    }

    /// Merge `habits` into `user`'s pending record after the next
    /// `list_pending`, as a concurrent write trigger would.
    pub fn merge_after_next_list(&self, user: UserId, habits: HabitSet) {
        *self.merge_after_list.lock().unwrap() = Some((user, habits));
    }
}

#[async_trait]
impl Store for InterferingStore {
    async fn put_user(&self, user: &User) -> mydaily_store::Result<()> {
        self.inner.put_user(user).await
    }

    async fn get_user(&self, user_id: &UserId) -> mydaily_store::Result<Option<User>> {
        self.inner.get_user(user_id).await
    }

    async fn list_users(&self) -> mydaily_store::Result<Vec<User>> {
        self.inner.list_users().await
    }

    async fn set_push_token(
        &self,
        user_id: &UserId,
        token: Option<String>,
    ) -> mydaily_store::Result<()> {
        self.inner.set_push_token(user_id, token).await
    }

    async fn get_habit_record(
        &self,
        date: NaiveDate,
        user_id: &UserId,
    ) -> mydaily_store::Result<Option<HabitRecord>> {
        self.inner.get_habit_record(date, user_id).await
    }

    async fn put_habit_record(
        &self,
        record: &HabitRecord,
    ) -> mydaily_store::Result<Option<HabitRecord>> {
        self.inner.put_habit_record(record).await
    }

    async fn toggle_habit(
        &self,
        date: NaiveDate,
        user_id: &UserId,
        habit: HabitKey,
        updated_at: DateTime<Utc>,
    ) -> mydaily_store::Result<(Option<HabitRecord>, HabitRecord)> {
        self.inner.toggle_habit(date, user_id, habit, updated_at).await
    }

    async fn list_habit_records(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> mydaily_store::Result<Vec<HabitRecord>> {
        self.inner.list_habit_records(from, to).await
    }

    async fn union_queued(
        &self,
        user_id: &UserId,
        date: NaiveDate,
        habits: &HabitSet,
        queued_at: DateTime<Utc>,
    ) -> mydaily_store::Result<QueuedNotification> {
        self.inner.union_queued(user_id, date, habits, queued_at).await
    }

    async fn list_queued_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> mydaily_store::Result<Vec<QueuedNotification>> {
        self.inner.list_queued_before(cutoff).await
    }

    async fn delete_queued(&self, date: NaiveDate, user_id: &UserId) -> mydaily_store::Result<()> {
        self.inner.delete_queued(date, user_id).await
    }

    async fn get_pending(
        &self,
        user_id: &UserId,
    ) -> mydaily_store::Result<Option<PendingNotification>> {
        self.inner.get_pending(user_id).await
    }

    async fn put_pending(
        &self,
        record: &PendingNotification,
        expected_version: Option<u64>,
    ) -> mydaily_store::Result<u64> {
        if self.reject_pending_writes {
            return Err(StoreError::Conflict {
                key: record.user_id.to_string(),
            });
        }
        self.inner.put_pending(record, expected_version).await
    }

    async fn list_pending(&self) -> mydaily_store::Result<Vec<PendingNotification>> {
        let listed = self.inner.list_pending().await?;

        let merge = self.merge_after_list.lock().unwrap().take();
        if let Some((user, habits)) = merge {
            let current = self.inner.get_pending(&user).await?;
            let expected = current.as_ref().map(|record| record.version);
            let record = match current {
                Some(record) => record.merged(&habits, test_now()),
                None => PendingNotification::new(user, habits, test_now()),
            };
            self.inner.put_pending(&record, expected).await?;
        }

        Ok(listed)
    }

    async fn delete_pending_if(&self, user_id: &UserId, version: u64) -> mydaily_store::Result<bool> {
        self.inner.delete_pending_if(user_id, version).await
    }
}

/// Fixed "now" used by the tests: 2024-06-01 12:00 UTC.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn today() -> NaiveDate {
    test_now().date_naive()
}

/// A habit record with the given counts.
pub fn record(user: u32, date: NaiveDate, counts: &[(HabitKey, u32)]) -> HabitRecord {
    let mut completions = Completions::new();
    for &(habit, count) in counts {
        completions.set_count(habit, count);
    }
    HabitRecord::new(UserId::from_ordinal(user), date, completions)
}

/// Pipeline wired to in-memory collaborators.
pub struct Pipeline {
    pub store: Arc<MemoryStore>,
    pub transport: Arc<RecordingTransport>,
    pub clock: Arc<MutableClock>,
    pub triggers: Triggers,
}

impl Pipeline {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self::with_settings(PipelineSettings {
            policy,
            ..PipelineSettings::default()
        })
    }

    pub fn with_settings(settings: PipelineSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::over(store.clone(), store, &settings)
    }

    /// Pipeline whose triggers go through `seen_by_triggers`, while
    /// `store` stays available for setup and assertions.
    pub fn over(
        store: Arc<MemoryStore>,
        seen_by_triggers: Arc<dyn Store>,
        settings: &PipelineSettings,
    ) -> Self {
        let transport = Arc::new(RecordingTransport::default());
        let clock = Arc::new(MutableClock::new(test_now()));
        let triggers = Triggers::new(seen_by_triggers, transport.clone(), clock.clone(), settings);
        Self {
            store,
            transport,
            clock,
            triggers,
        }
    }

    /// Provision `user_1..=count`, giving each the token `token-{n}`.
    pub async fn users_with_tokens(&self, count: u32) {
        for n in 1..=count {
            let user = User {
                fcm_token: Some(format!("token-{n}")),
                ..User::new(UserId::from_ordinal(n), n)
            };
            self.store.put_user(&user).await.unwrap();
        }
    }

    /// Write a record through the store and run the write trigger.
    pub async fn write(&self, record: &HabitRecord) -> mydaily_service::WriteOutcome {
        let previous = self.store.put_habit_record(record).await.unwrap();
        self.triggers
            .on_habit_record_write(previous.as_ref(), Some(record))
            .await
    }
}

/// Test harness containing everything needed for HTTP integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<RecordingTransport>,
    pub clock: Arc<MutableClock>,
    /// The service API key for the trigger endpoints.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a harness with `users` provisioned users and a fresh store.
    pub async fn new(users: u32) -> Self {
        let store = Arc::new(MemoryStore::new());
        mydaily_service::provision::seed_users(store.as_ref(), users)
            .await
            .expect("Failed to seed users");

        let transport = Arc::new(RecordingTransport::default());
        let clock = Arc::new(MutableClock::new(test_now()));
        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            service_api_key: Some(service_api_key.clone()),
            ..ServiceConfig::default()
        };

        let state = AppState::new(store.clone(), transport.clone(), clock.clone(), config);
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            transport,
            clock,
            service_api_key,
        }
    }
}
