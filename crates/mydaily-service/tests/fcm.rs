//! FCM client tests against a mock HTTP server.

use mydaily_service::fcm::ServiceAccountTokenSource;
use mydaily_service::{FcmClient, Notification, PushError, PushTransport, ServiceAccountKey};
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEND_PATH: &str = "/v1/projects/demo/messages:send";

fn notification() -> Notification {
    Notification {
        title: "🦥 a complété une habitude!".into(),
        body: "☀️".into(),
    }
}

fn unregistered_error() -> serde_json::Value {
    json!({
        "error": {
            "code": 404,
            "message": "Requested entity was not found.",
            "status": "NOT_FOUND",
            "details": [{
                "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                "errorCode": "UNREGISTERED"
            }]
        }
    })
}

async fn mount_send(server: &MockServer, token: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(json!({ "message": { "token": token } })))
        .respond_with(response)
        .mount(server)
        .await;
}

fn service_account(token_uri: String) -> ServiceAccountKey {
    ServiceAccountKey {
        project_id: "demo".into(),
        client_email: "push@demo.iam.gserviceaccount.com".into(),
        private_key: include_str!("fixtures/test-rsa-key.pem").into(),
        token_uri,
    }
}

#[tokio::test]
async fn multicast_reports_per_token_results_in_order() {
    let server = MockServer::start().await;
    mount_send(
        &server,
        "good",
        ResponseTemplate::new(200).set_body_json(json!({ "name": "projects/demo/messages/1" })),
    )
    .await;
    mount_send(
        &server,
        "gone",
        ResponseTemplate::new(404).set_body_json(unregistered_error()),
    )
    .await;
    mount_send(&server, "broken", ResponseTemplate::new(503)).await;

    let client = FcmClient::with_access_token(server.uri(), "demo", "static-token").unwrap();
    let response = client
        .send_multicast(
            &notification(),
            &["gone".into(), "good".into(), "broken".into()],
        )
        .await
        .unwrap();

    assert_eq!(response.success_count, 1);
    assert_eq!(response.failure_count, 2);
    assert_eq!(response.responses[0].error.as_deref(), Some("UNREGISTERED"));
    assert_eq!(
        response.responses[1].message_id.as_deref(),
        Some("projects/demo/messages/1")
    );
    assert_eq!(response.responses[2].error.as_deref(), Some("503"));
}

#[tokio::test]
async fn sends_notification_payload_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(header("authorization", "Bearer static-token"))
        .and(body_partial_json(json!({
            "message": {
                "token": "device",
                "notification": { "title": "🦥 a complété une habitude!", "body": "☀️" }
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": "projects/demo/messages/9" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = FcmClient::with_access_token(server.uri(), "demo", "static-token").unwrap();
    let response = client
        .send_multicast(&notification(), &["device".into()])
        .await
        .unwrap();

    assert_eq!(response.success_count, 1);
}

#[tokio::test]
async fn empty_token_list_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = FcmClient::with_access_token(server.uri(), "demo", "static-token").unwrap();
    let response = client.send_multicast(&notification(), &[]).await.unwrap();

    assert_eq!(response.success_count + response.failure_count, 0);
}

#[tokio::test]
async fn service_account_token_is_minted_once_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "minted-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(header("authorization", "Bearer minted-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": "projects/demo/messages/2" })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let source =
        ServiceAccountTokenSource::new(service_account(format!("{}/token", server.uri()))).unwrap();
    let client = FcmClient::with_service_account(server.uri(), None, source).unwrap();
    assert_eq!(client.project_id(), "demo");

    for _ in 0..2 {
        let response = client
            .send_multicast(&notification(), &["device".into()])
            .await
            .unwrap();
        assert_eq!(response.success_count, 1);
    }
}

#[tokio::test]
async fn token_endpoint_failure_fails_the_whole_multicast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let source =
        ServiceAccountTokenSource::new(service_account(format!("{}/token", server.uri()))).unwrap();
    let client = FcmClient::with_service_account(server.uri(), None, source).unwrap();

    let result = client
        .send_multicast(&notification(), &["a".into(), "b".into()])
        .await;

    assert!(matches!(result, Err(PushError::Auth(_))));
}
