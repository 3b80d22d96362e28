//! FCM HTTP v1 wire types.

use serde::{Deserialize, Serialize};

/// Body of `projects/{id}/messages:send`.
#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    /// The message to send.
    pub message: Message<'a>,
}

/// A message addressed to one registration token.
#[derive(Debug, Serialize)]
pub struct Message<'a> {
    /// Device registration token.
    pub token: &'a str,
    /// Display notification.
    pub notification: NotificationPayload<'a>,
}

/// Notification title and body.
#[derive(Debug, Serialize)]
pub struct NotificationPayload<'a> {
    /// Title line.
    pub title: &'a str,
    /// Body text.
    pub body: &'a str,
}

/// Successful send response.
#[derive(Debug, Deserialize)]
pub struct SendResponse {
    /// Message resource name, `projects/*/messages/{id}`.
    pub name: String,
}

/// Google API error envelope.
#[derive(Debug, Deserialize)]
pub struct FcmErrorResponse {
    /// Error details.
    pub error: FcmErrorBody,
}

/// Google API error body.
#[derive(Debug, Deserialize)]
pub struct FcmErrorBody {
    /// HTTP status code.
    #[serde(default)]
    pub code: u16,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Canonical status, e.g. `NOT_FOUND`.
    #[serde(default)]
    pub status: Option<String>,
    /// Typed details; FCM puts its error code in one of them.
    #[serde(default)]
    pub details: Vec<FcmErrorDetail>,
}

/// One entry of `error.details`.
#[derive(Debug, Deserialize)]
pub struct FcmErrorDetail {
    /// Detail type URL.
    #[serde(rename = "@type", default)]
    pub type_url: Option<String>,
    /// FCM error code, e.g. `UNREGISTERED`.
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
}

impl FcmErrorBody {
    /// The most specific error code available.
    #[must_use]
    pub fn error_code(&self) -> String {
        self.details
            .iter()
            .find_map(|detail| detail.error_code.clone())
            .or_else(|| self.status.clone())
            .unwrap_or_else(|| self.code.to_string())
    }
}

/// OAuth token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Bearer token.
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}
