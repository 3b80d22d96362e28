//! Notification fanout.
//!
//! Builds the text for one user's activations and multicasts it. Nothing
//! here ever fails the caller: transport errors and rejected tokens are
//! logged and reported.

use std::sync::Arc;

use mydaily_core::{HabitSet, NotificationText, User};

use crate::transport::{Notification, PushTransport};

/// Result of one fanout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Messages the provider accepted.
    pub success_count: usize,
    /// Messages that were rejected or never sent.
    pub failure_count: usize,
    /// Tokens whose delivery failed.
    pub failed_tokens: Vec<String>,
}

impl DeliveryReport {
    /// Whether anything was attempted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.success_count == 0 && self.failure_count == 0
    }
}

/// Sends activation notifications through a push transport.
#[derive(Clone)]
pub struct FanoutSender {
    transport: Arc<dyn PushTransport>,
}

impl FanoutSender {
    /// Create a sender over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn PushTransport>) -> Self {
        Self { transport }
    }

    /// Notify `tokens` that `activating` completed `habits`.
    ///
    /// Empty token lists and empty habit sets make no transport call.
    pub async fn send(&self, activating: &User, habits: &HabitSet, tokens: &[String]) -> DeliveryReport {
        if tokens.is_empty() || habits.is_empty() {
            tracing::debug!(user_id = %activating.id, "No recipients or habits, skipping fanout");
            return DeliveryReport::default();
        }

        let notification =
            Notification::from(NotificationText::for_activation(activating.display_order, habits));

        match self.transport.send_multicast(&notification, tokens).await {
            Ok(response) => {
                let failed_tokens: Vec<String> = tokens
                    .iter()
                    .zip(&response.responses)
                    .filter(|(_, result)| !result.success)
                    .map(|(token, _)| token.clone())
                    .collect();

                for (token, result) in tokens.iter().zip(&response.responses) {
                    if !result.success {
                        tracing::warn!(
                            user_id = %activating.id,
                            token = %token,
                            error = ?result.error,
                            "Push delivery failed"
                        );
                    }
                }

                tracing::info!(
                    user_id = %activating.id,
                    success_count = response.success_count,
                    failure_count = response.failure_count,
                    "Notifications sent"
                );

                DeliveryReport {
                    success_count: response.success_count,
                    failure_count: response.failure_count,
                    failed_tokens,
                }
            }
            Err(e) => {
                tracing::error!(
                    user_id = %activating.id,
                    recipients = tokens.len(),
                    error = %e,
                    "Push multicast failed"
                );
                DeliveryReport {
                    success_count: 0,
                    failure_count: tokens.len(),
                    failed_tokens: tokens.to_vec(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use mydaily_core::{HabitKey, UserId};

    use super::*;
    use crate::transport::{MulticastResponse, PushError, TokenResult};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(Notification, Vec<String>)>>,
    }

    #[async_trait]
    impl PushTransport for Recorder {
        async fn send_multicast(
            &self,
            notification: &Notification,
            tokens: &[String],
        ) -> Result<MulticastResponse, PushError> {
            self.calls
                .lock()
                .unwrap()
                .push((notification.clone(), tokens.to_vec()));
            Ok(MulticastResponse::from_results(
                tokens
                    .iter()
                    .map(|t| {
                        if t.starts_with("bad") {
                            TokenResult::failed("UNREGISTERED")
                        } else {
                            TokenResult::delivered(format!("projects/p/messages/{t}"))
                        }
                    })
                    .collect(),
            ))
        }
    }

    fn sloth() -> User {
        User::new(UserId::from_ordinal(1), 1)
    }

    #[tokio::test]
    async fn builds_text_and_reports_failed_tokens() {
        let recorder = Arc::new(Recorder::default());
        let sender = FanoutSender::new(recorder.clone());

        let report = sender
            .send(
                &sloth(),
                &HabitSet::from([HabitKey::Network, HabitKey::Sun]),
                &["good".into(), "bad-1".into()],
            )
            .await;

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_tokens, vec!["bad-1".to_string()]);

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.title, "🦥 a complété 2 habitudes!");
        assert_eq!(calls[0].0.body, "☀️ 🌐");
    }

    #[tokio::test]
    async fn no_tokens_means_no_call() {
        let recorder = Arc::new(Recorder::default());
        let sender = FanoutSender::new(recorder.clone());

        let report = sender
            .send(&sloth(), &HabitSet::from([HabitKey::Book]), &[])
            .await;

        assert!(report.is_empty());
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_errors_are_absorbed() {
        let sender = FanoutSender::new(Arc::new(crate::transport::UnconfiguredTransport));
        let report = sender
            .send(&sloth(), &HabitSet::from([HabitKey::Book]), &["a".into(), "b".into()])
            .await;
        assert_eq!(report.success_count, 0);
        assert_eq!(report.failure_count, 2);
    }
}
