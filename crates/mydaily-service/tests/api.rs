//! HTTP API tests.

mod common;

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use common::{test_now, TestHarness};
use mydaily_core::{HabitRecord, UserId};
use mydaily_store::Store;
use serde_json::{json, Value};

fn api_key_header() -> HeaderName {
    HeaderName::from_static("x-api-key")
}

fn api_key(harness: &TestHarness) -> HeaderValue {
    HeaderValue::from_str(&harness.service_api_key).unwrap()
}

/// Wait for the background write trigger spawned by a toggle.
async fn wait_for_pending(harness: &TestHarness, user: &UserId) -> bool {
    for _ in 0..100 {
        if harness.store.get_pending(user).await.unwrap().is_some() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn register_token(harness: &TestHarness, user: u32, token: &str) {
    harness
        .server
        .put(&format!("/v1/users/user_{user}/push-token"))
        .json(&json!({ "token": token }))
        .await
        .assert_status_ok();
}

// ============================================================================
// Health & users
// ============================================================================

#[tokio::test]
async fn health_check() {
    let harness = TestHarness::new(0).await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "mydaily");
    assert_eq!(body["storeBackend"], "memory");
    assert_eq!(body["aggregationPolicy"], "pending");
    assert_eq!(body["pushConfigured"], false);
}

#[tokio::test]
async fn users_are_listed_without_tokens() {
    let harness = TestHarness::new(3).await;
    register_token(&harness, 2, "secret-device-token").await;

    let response = harness.server.get("/v1/users").await;

    response.assert_status_ok();
    let text = response.text();
    assert!(!text.contains("secret-device-token"));

    let users: Vec<Value> = serde_json::from_str(&text).unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(users[0]["id"], "user_1");
    assert_eq!(users[0]["avatar"], "🦥");
    assert_eq!(users[0]["hasPushToken"], false);
    assert_eq!(users[1]["hasPushToken"], true);
}

#[tokio::test]
async fn push_token_is_replaced() {
    let harness = TestHarness::new(1).await;
    register_token(&harness, 1, "first").await;
    register_token(&harness, 1, "second").await;

    let user = harness
        .store
        .get_user(&UserId::from_ordinal(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.fcm_token.as_deref(), Some("second"));

    harness
        .server
        .put("/v1/users/user_1/push-token")
        .json(&json!({ "token": null }))
        .await
        .assert_status_ok();
    let user = harness
        .store
        .get_user(&UserId::from_ordinal(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.fcm_token, None);
}

#[tokio::test]
async fn push_token_for_unknown_user_is_not_found() {
    let harness = TestHarness::new(1).await;

    let response = harness
        .server
        .put("/v1/users/user_9/push-token")
        .json(&json!({ "token": "t" }))
        .await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn invalid_user_id_is_rejected() {
    let harness = TestHarness::new(1).await;

    let response = harness
        .server
        .put("/v1/users/bad%20id/push-token")
        .json(&json!({ "token": "t" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Habits
// ============================================================================

#[tokio::test]
async fn toggle_cycles_and_triggers_aggregation() {
    let harness = TestHarness::new(2).await;

    let response = harness
        .server
        .post("/v1/habits/2024-06-01/user_1/toggle")
        .json(&json!({ "habit": "book" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["record"]["completions"]["book"], 1);
    assert_eq!(body["record"]["userId"], "user_1");

    assert!(wait_for_pending(&harness, &UserId::from_ordinal(1)).await);

    // Toggling another habit keeps the first one.
    let body: Value = harness
        .server
        .post("/v1/habits/2024-06-01/user_1/toggle")
        .json(&json!({ "habit": "sun" }))
        .await
        .json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["record"]["completions"]["book"], 1);

    // book has a maximum of 2, so the third toggle wraps to 0
    for expected in [2, 0] {
        let body: Value = harness
            .server
            .post("/v1/habits/2024-06-01/user_1/toggle")
            .json(&json!({ "habit": "book" }))
            .await
            .json();
        assert_eq!(body["count"], expected);
    }
}

#[tokio::test]
async fn toggle_rejects_unknown_habit_date_and_user() {
    let harness = TestHarness::new(1).await;

    let response = harness
        .server
        .post("/v1/habits/2024-06-01/user_1/toggle")
        .json(&json!({ "habit": "doubleBook" }))
        .await;
    assert!(response.status_code().is_client_error());

    let response = harness
        .server
        .post("/v1/habits/2024-13-01/user_1/toggle")
        .json(&json!({ "habit": "sun" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = harness
        .server
        .post("/v1/habits/2024-06-01/user_5/toggle")
        .json(&json!({ "habit": "sun" }))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn habits_default_to_last_thirty_days() {
    let harness = TestHarness::new(1).await;
    let user = UserId::from_ordinal(1);
    let today = test_now().date_naive();

    for days_ago in [0, 29, 30] {
        let record = HabitRecord::new(
            user.clone(),
            today - chrono::TimeDelta::days(days_ago),
            mydaily_core::Completions::new(),
        );
        harness.store.put_habit_record(&record).await.unwrap();
    }

    let records: Vec<Value> = harness.server.get("/v1/habits").await.json();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["date"], "2024-05-03");
    assert_eq!(records[1]["date"], "2024-06-01");

    let records: Vec<Value> = harness
        .server
        .get("/v1/habits")
        .add_query_param("from", "2024-05-01")
        .add_query_param("to", "2024-05-31")
        .await
        .json();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let harness = TestHarness::new(1).await;

    let response = harness
        .server
        .get("/v1/habits")
        .add_query_param("from", "2024-06-02")
        .add_query_param("to", "2024-06-01")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Triggers
// ============================================================================

#[tokio::test]
async fn trigger_routes_require_service_key() {
    let harness = TestHarness::new(1).await;

    harness
        .server
        .post("/v1/triggers/tick")
        .await
        .assert_status_unauthorized();

    harness
        .server
        .post("/v1/triggers/tick")
        .add_header(api_key_header(), HeaderValue::from_static("wrong"))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn toggle_then_tick_notifies_other_users() {
    let harness = TestHarness::new(3).await;
    register_token(&harness, 1, "device-1").await;
    register_token(&harness, 2, "device-2").await;
    register_token(&harness, 3, "device-3").await;

    harness
        .server
        .post("/v1/habits/2024-06-01/user_2/toggle")
        .json(&json!({ "habit": "sun" }))
        .await
        .assert_status_ok();
    assert!(wait_for_pending(&harness, &UserId::from_ordinal(2)).await);

    let report: Value = harness
        .server
        .post("/v1/triggers/tick")
        .add_header(api_key_header(), api_key(&harness))
        .await
        .json();
    assert_eq!(report["processed"], 1);
    assert_eq!(report["notified"], 1);

    let sent = harness.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tokens, vec!["device-1", "device-3"]);
    assert_eq!(sent[0].notification.title, "🐘 a complété une habitude!");
}

#[tokio::test]
async fn habit_write_trigger_reports_outcome() {
    let harness = TestHarness::new(2).await;

    let response = harness
        .server
        .post("/v1/triggers/habit-write")
        .add_header(api_key_header(), api_key(&harness))
        .json(&json!({
            "before": { "userId": "user_1", "date": "2024-06-01", "completions": { "sun": false } },
            "after": { "userId": "user_1", "date": "2024-06-01", "completions": { "sun": true, "network": 1 } }
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["outcome"], "merged");
    assert_eq!(body["habits"], json!(["sun", "network"]));

    let body: Value = harness
        .server
        .post("/v1/triggers/habit-write")
        .add_header(api_key_header(), api_key(&harness))
        .json(&json!({
            "before": { "userId": "user_1", "date": "2024-06-01", "completions": { "sun": true } }
        }))
        .await
        .json();
    assert_eq!(body["outcome"], "deleted");

    let body: Value = harness
        .server
        .post("/v1/triggers/habit-write")
        .add_header(api_key_header(), api_key(&harness))
        .json(&json!({
            "after": { "userId": "user_1", "date": "2024-05-31", "completions": { "book": 1 } }
        }))
        .await
        .json();
    assert_eq!(body["outcome"], "backfill");
}
