//! Push transport abstraction.
//!
//! The pipeline only sees `PushTransport`; the FCM client and test doubles
//! implement it.

use async_trait::async_trait;
use serde::Serialize;

use mydaily_core::NotificationText;

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
}

impl From<NotificationText> for Notification {
    fn from(text: NotificationText) -> Self {
        Self {
            title: text.title,
            body: text.body,
        }
    }
}

/// Outcome for one token of a multicast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResult {
    /// Whether the provider accepted the message.
    pub success: bool,
    /// Provider message name on success.
    pub message_id: Option<String>,
    /// Provider error code on failure.
    pub error: Option<String>,
}

impl TokenResult {
    /// A delivered message.
    #[must_use]
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    /// A rejected message.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Per-token results of a multicast, in token order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MulticastResponse {
    /// Number of accepted messages.
    pub success_count: usize,
    /// Number of rejected messages.
    pub failure_count: usize,
    /// One entry per token.
    pub responses: Vec<TokenResult>,
}

impl MulticastResponse {
    /// Tally per-token results.
    #[must_use]
    pub fn from_results(responses: Vec<TokenResult>) -> Self {
        let success_count = responses.iter().filter(|r| r.success).count();
        Self {
            success_count,
            failure_count: responses.len() - success_count,
            responses,
        }
    }
}

/// Errors that fail a whole multicast.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// No push credentials are configured.
    #[error("push transport not configured")]
    NotConfigured,

    /// Service-account key could not be read or used.
    #[error("invalid push credentials: {0}")]
    Credentials(String),

    /// Access token could not be obtained.
    #[error("push authentication failed: {0}")]
    Auth(String),

    /// HTTP client failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Sends one notification to many device tokens.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Send `notification` to every token.
    ///
    /// Per-token rejections are reported in the response, not as an error.
    async fn send_multicast(
        &self,
        notification: &Notification,
        tokens: &[String],
    ) -> Result<MulticastResponse, PushError>;
}

/// Transport used when no push credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredTransport;

#[async_trait]
impl PushTransport for UnconfiguredTransport {
    async fn send_multicast(
        &self,
        _notification: &Notification,
        _tokens: &[String],
    ) -> Result<MulticastResponse, PushError> {
        Err(PushError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_results() {
        let response = MulticastResponse::from_results(vec![
            TokenResult::delivered("projects/p/messages/1"),
            TokenResult::failed("UNREGISTERED"),
            TokenResult::delivered("projects/p/messages/2"),
        ]);
        assert_eq!(response.success_count, 2);
        assert_eq!(response.failure_count, 1);
        assert_eq!(response.responses[1].error.as_deref(), Some("UNREGISTERED"));
    }

    #[tokio::test]
    async fn unconfigured_transport_refuses() {
        let notification = Notification {
            title: "t".into(),
            body: "b".into(),
        };
        let result = UnconfiguredTransport
            .send_multicast(&notification, &["tok".into()])
            .await;
        assert!(matches!(result, Err(PushError::NotConfigured)));
    }
}
