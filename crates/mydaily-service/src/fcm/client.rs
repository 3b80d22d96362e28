//! FCM HTTP v1 client implementation.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;

use super::oauth::ServiceAccountTokenSource;
use super::types::{FcmErrorResponse, Message, NotificationPayload, SendRequest, SendResponse};
use crate::config::FcmConfig;
use crate::transport::{MulticastResponse, Notification, PushError, PushTransport, TokenResult};

enum Credentials {
    Static(String),
    ServiceAccount(ServiceAccountTokenSource),
}

/// FCM HTTP v1 client.
pub struct FcmClient {
    client: Client,
    base_url: String,
    project_id: String,
    credentials: Credentials,
}

impl std::fmt::Debug for FcmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcmClient")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl FcmClient {
    /// Create a client that sends with a pre-minted access token.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API origin (e.g., `"https://fcm.googleapis.com"`)
    /// * `project_id` - Firebase project id
    /// * `access_token` - OAuth bearer token
    pub fn with_access_token(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, PushError> {
        Ok(Self {
            client: build_http_client()?,
            base_url: normalize_base_url(base_url.into()),
            project_id: project_id.into(),
            credentials: Credentials::Static(access_token.into()),
        })
    }

    /// Create a client that mints access tokens from a service account.
    pub fn with_service_account(
        base_url: impl Into<String>,
        project_id: Option<String>,
        token_source: ServiceAccountTokenSource,
    ) -> Result<Self, PushError> {
        let project_id = project_id.unwrap_or_else(|| token_source.project_id().to_string());
        Ok(Self {
            client: build_http_client()?,
            base_url: normalize_base_url(base_url.into()),
            project_id,
            credentials: Credentials::ServiceAccount(token_source),
        })
    }

    /// Build a client from configuration. Returns `Ok(None)` when no
    /// credentials are configured.
    pub fn from_config(config: &FcmConfig) -> Result<Option<Self>, PushError> {
        if let Some(key) = config.service_account.clone() {
            let source = ServiceAccountTokenSource::new(key)?;
            return Self::with_service_account(&config.api_url, config.project_id.clone(), source)
                .map(Some);
        }

        match (&config.access_token, &config.project_id) {
            (Some(token), Some(project)) => {
                Self::with_access_token(&config.api_url, project, token).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// The project messages are sent under.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn access_token(&self) -> Result<String, PushError> {
        match &self.credentials {
            Credentials::Static(token) => Ok(token.clone()),
            Credentials::ServiceAccount(source) => source.access_token(&self.client).await,
        }
    }

    /// Send to a single token. Every failure is reported per token.
    async fn send_one(
        &self,
        access_token: &str,
        notification: &Notification,
        token: &str,
    ) -> TokenResult {
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url, self.project_id
        );
        let request = SendRequest {
            message: Message {
                token,
                notification: NotificationPayload {
                    title: &notification.title,
                    body: &notification.body,
                },
            },
        };

        let response = match self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return TokenResult::failed(format!("request failed: {e}")),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<SendResponse>().await {
                Ok(sent) => TokenResult::delivered(sent.name),
                Err(e) => TokenResult::failed(format!("invalid response: {e}")),
            };
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<FcmErrorResponse>(&body) {
            Ok(error) => TokenResult::failed(error.error.error_code()),
            Err(_) => TokenResult::failed(status.as_u16().to_string()),
        }
    }
}

#[async_trait]
impl PushTransport for FcmClient {
    async fn send_multicast(
        &self,
        notification: &Notification,
        tokens: &[String],
    ) -> Result<MulticastResponse, PushError> {
        if tokens.is_empty() {
            return Ok(MulticastResponse::default());
        }

        let access_token = self.access_token().await?;
        let results = join_all(
            tokens
                .iter()
                .map(|token| self.send_one(&access_token, notification, token)),
        )
        .await;

        Ok(MulticastResponse::from_results(results))
    }
}

fn build_http_client() -> Result<Client, PushError> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(PushError::Http)
}

fn normalize_base_url(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_without_credentials_is_none() {
        let config = FcmConfig {
            api_url: "https://fcm.googleapis.com".into(),
            ..FcmConfig::default()
        };
        assert!(FcmClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn from_config_with_static_token() {
        let config = FcmConfig {
            api_url: "https://fcm.googleapis.com/".into(),
            project_id: Some("demo".into()),
            access_token: Some("token".into()),
            service_account: None,
        };
        let client = FcmClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.project_id(), "demo");
        assert_eq!(client.base_url, "https://fcm.googleapis.com");
    }
}
