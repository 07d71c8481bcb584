// src/services/messaging_service.rs
use async_trait::async_trait;
use futures::{StreamExt, stream};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing;

use crate::{
    errors::NotifyError as AppError,
    models::delivery::DeliveryErrorKind,
    models::notification::{DispatchResult, OutboundMessage},
};

/// Upper bound on in-flight sends within one send_each call.
const SEND_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub project_id: String,
    pub access_token: String,
    pub base_url: String,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            project_id: std::env::var("FCM_PROJECT_ID").unwrap_or_else(|_| "".to_string()),
            access_token: std::env::var("FCM_ACCESS_TOKEN").unwrap_or_else(|_| "".to_string()),
            base_url: "https://fcm.googleapis.com/v1".to_string(),
        }
    }
}

/// Push delivery capability. Each message is attempted independently;
/// send_each aggregates per-message outcomes and only errors when the batch
/// itself cannot be submitted.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryErrorKind>;

    async fn send_each(&self, messages: Vec<OutboundMessage>) -> Result<DispatchResult, AppError> {
        let outcomes = stream::iter(messages.into_iter().map(|message| async move {
            let outcome = self.send(&message).await;
            (message.token, outcome)
        }))
        .buffered(SEND_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

        let mut result = DispatchResult::default();
        for (token, outcome) in outcomes {
            match outcome {
                Ok(()) => result.record_success(),
                Err(kind) => {
                    tracing::warn!("Send to token {} failed: {}", token, kind);
                    result.record_failure(token, kind);
                }
            }
        }
        Ok(result)
    }
}

pub struct FcmClient {
    config: FcmConfig,
    client: reqwest::Client,
}

impl FcmClient {
    pub fn new(config: FcmConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn send_url(&self) -> String {
        format!(
            "{}/projects/{}/messages:send",
            self.config.base_url, self.config.project_id
        )
    }
}

#[async_trait]
impl MessagingClient for FcmClient {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryErrorKind> {
        if message.token.is_empty() {
            return Err(DeliveryErrorKind::InvalidToken);
        }

        tracing::debug!("Sending FCM notification to device: {}", message.token);

        let body = json!({
            "message": {
                "token": message.token,
                "notification": message.notification,
                "android": {
                    "priority": message.hints.android_priority,
                    "notification": { "sound": message.hints.android_sound }
                },
                "apns": {
                    "payload": { "aps": { "sound": message.hints.apns_sound } }
                },
                "data": message.data,
            }
        });

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    DeliveryErrorKind::Unavailable
                } else {
                    DeliveryErrorKind::Other(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("FCM request failed with {}: {}", status, error_text);
            return Err(classify_failure(status, &error_text));
        }

        tracing::debug!("FCM notification sent successfully");
        Ok(())
    }
}

/// Map an FCM v1 error response to a delivery error kind.
fn classify_failure(status: reqwest::StatusCode, body: &str) -> DeliveryErrorKind {
    if status == reqwest::StatusCode::NOT_FOUND || body.contains("UNREGISTERED") {
        DeliveryErrorKind::Unregistered
    } else if status == reqwest::StatusCode::BAD_REQUEST {
        DeliveryErrorKind::InvalidToken
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || body.contains("QUOTA_EXCEEDED") {
        DeliveryErrorKind::QuotaExceeded
    } else if status.is_server_error() {
        DeliveryErrorKind::Unavailable
    } else {
        DeliveryErrorKind::Other(format!("status {}", status))
    }
}

// Mock client for development and testing
#[derive(Default)]
pub struct MockMessagingClient {
    sent: Mutex<Vec<OutboundMessage>>,
    failing_tokens: Mutex<HashSet<String>>,
}

impl MockMessagingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to this token fail with Unregistered.
    pub fn fail_token(&self, token: &str) {
        self.failing_tokens.lock().unwrap().insert(token.to_string());
    }

    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingClient for MockMessagingClient {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryErrorKind> {
        tracing::info!(
            "[MOCK] Would send FCM to {}: {} - {}",
            message.token,
            message.notification.title,
            message.notification.body
        );
        self.sent.lock().unwrap().push(message.clone());

        if self.failing_tokens.lock().unwrap().contains(&message.token) {
            return Err(DeliveryErrorKind::Unregistered);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::{MessageData, MessageTemplate, NotificationContent, PlatformHints};

    fn message(token: &str) -> OutboundMessage {
        MessageTemplate {
            notification: NotificationContent {
                title: "Leak".to_string(),
                body: "Pipe burst".to_string(),
            },
            hints: PlatformHints::default(),
            data: MessageData {
                click_action: "OPEN".to_string(),
                ticket_id: "t-1".to_string(),
                kind: "ticket_update".to_string(),
            },
        }
        .with_token(token)
    }

    #[test]
    fn test_classify_failure() {
        use reqwest::StatusCode;

        assert_eq!(
            classify_failure(StatusCode::NOT_FOUND, ""),
            DeliveryErrorKind::Unregistered
        );
        assert_eq!(
            classify_failure(StatusCode::OK, "error_code: UNREGISTERED"),
            DeliveryErrorKind::Unregistered
        );
        assert_eq!(
            classify_failure(StatusCode::BAD_REQUEST, ""),
            DeliveryErrorKind::InvalidToken
        );
        assert_eq!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, ""),
            DeliveryErrorKind::QuotaExceeded
        );
        assert_eq!(
            classify_failure(StatusCode::SERVICE_UNAVAILABLE, ""),
            DeliveryErrorKind::Unavailable
        );
    }

    #[tokio::test]
    async fn test_send_each_aggregates_outcomes_in_order() {
        let client = MockMessagingClient::new();
        client.fail_token("tok-2");

        let result = client
            .send_each(vec![message("tok-1"), message("tok-2"), message("tok-3")])
            .await
            .unwrap();

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].token, "tok-2");
        assert_eq!(result.failures[0].kind, DeliveryErrorKind::Unregistered);
        assert_eq!(client.sent_count(), 3);
    }

    #[tokio::test]
    async fn test_send_each_with_no_messages() {
        let client = MockMessagingClient::new();
        let result = client.send_each(Vec::new()).await.unwrap();
        assert_eq!(result, DispatchResult::default());
        assert_eq!(client.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let client = FcmClient::new(FcmConfig {
            project_id: "demo".to_string(),
            access_token: "token".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
        });

        let outcome = client.send(&message("")).await;
        assert_eq!(outcome, Err(DeliveryErrorKind::InvalidToken));
    }
}
