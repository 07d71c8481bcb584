// src/services/dispatcher.rs
use std::sync::Arc;
use tracing;

use crate::{
    models::delivery::DeliveryErrorKind,
    models::notification::{DispatchResult, NotificationRequest, NotificationTarget, OutboundMessage},
    services::{
        messaging_service::MessagingClient, payload_builder::PayloadBuilder,
        store_service::DocumentStore, token_resolver::TokenResolver,
    },
};

/// Orchestrates one notification event: resolve recipients, build the
/// payload, fan out one message per token, aggregate outcomes. Never raises
/// back to the trigger caller; every failure ends up in the result or the log.
pub struct NotificationDispatcher {
    resolver: TokenResolver,
    messaging: Arc<dyn MessagingClient>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn DocumentStore>, messaging: Arc<dyn MessagingClient>) -> Self {
        Self {
            resolver: TokenResolver::new(store),
            messaging,
        }
    }

    pub async fn dispatch(&self, request: &NotificationRequest) -> DispatchResult {
        let target = NotificationTarget::from(request);
        let recipients = self.resolver.resolve(&target).await;

        if recipients.is_empty() {
            // Normal terminal outcome, not an error.
            tracing::info!("No recipients resolved, nothing to send");
            return DispatchResult::default();
        }

        let template = PayloadBuilder::build(request);
        let messages: Vec<OutboundMessage> = recipients
            .iter()
            .map(|recipient| template.clone().with_token(&recipient.token))
            .collect();

        tracing::info!("Dispatching notification to {} recipients", messages.len());

        match self.messaging.send_each(messages).await {
            Ok(result) => {
                if result.failure_count > 0 {
                    tracing::warn!(
                        "Dispatch finished with {} sent, {} failed",
                        result.success_count,
                        result.failure_count
                    );
                } else {
                    tracing::info!("Dispatch finished, {} sent", result.success_count);
                }
                result
            }
            Err(e) => {
                // Total batch-submission failure: absorbed so the trigger
                // returns normally and the platform does not retry.
                tracing::error!("Batch submission to delivery provider failed: {}", e);
                let mut result = DispatchResult::default();
                for recipient in recipients {
                    result.record_failure(recipient.token, DeliveryErrorKind::Unavailable);
                }
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::NotifyError,
        models::notification::OutboundMessage,
        services::{messaging_service::MockMessagingClient, store_service::MemoryStore},
    };
    use async_trait::async_trait;
    use serde_json::json;

    fn user_request(user_id: &str) -> NotificationRequest {
        NotificationRequest {
            user_id: Some(user_id.to_string()),
            title: Some("Leak".to_string()),
            body: Some("Pipe burst in block C".to_string()),
            ticket_id: Some("t-42".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_dispatch_with_no_recipients_skips_provider() {
        let store = Arc::new(MemoryStore::new());
        let messaging = Arc::new(MockMessagingClient::new());
        let dispatcher = NotificationDispatcher::new(store, messaging.clone());

        let result = dispatcher.dispatch(&user_request("ghost")).await;

        assert_eq!(result, DispatchResult::default());
        assert_eq!(messaging.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_to_single_user() {
        let store = Arc::new(MemoryStore::new());
        store.insert("students", "u-1", json!({"fcmToken": "tok-1"}));
        let messaging = Arc::new(MockMessagingClient::new());
        let dispatcher = NotificationDispatcher::new(store, messaging.clone());

        let result = dispatcher.dispatch(&user_request("u-1")).await;

        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 0);

        let sent = messaging.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token, "tok-1");
        assert_eq!(sent[0].notification.title, "Leak");
        assert_eq!(sent[0].data.ticket_id, "t-42");
    }

    #[tokio::test]
    async fn test_dispatch_partial_failure_does_not_raise() {
        let store = Arc::new(MemoryStore::new());
        store.insert("maintenance", "m-1", json!({"fcmToken": "tok-1"}));
        store.insert("maintenance", "m-2", json!({"fcmToken": "tok-2"}));
        store.insert("maintenance", "m-3", json!({"fcmToken": "tok-3"}));
        let messaging = Arc::new(MockMessagingClient::new());
        messaging.fail_token("tok-2");
        let dispatcher = NotificationDispatcher::new(store, messaging.clone());

        let request = NotificationRequest {
            target_role: Some("maintenance".to_string()),
            ..Default::default()
        };
        let result = dispatcher.dispatch(&request).await;

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.failures[0].token, "tok-2");
        assert_eq!(messaging.sent_count(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_preserves_duplicate_tokens() {
        let store = Arc::new(MemoryStore::new());
        // Two documents in one role collection sharing a token get two sends.
        store.insert("admins", "a-1", json!({"fcmToken": "tok-shared"}));
        store.insert("admins", "a-2", json!({"fcmToken": "tok-shared"}));
        let messaging = Arc::new(MockMessagingClient::new());
        let dispatcher = NotificationDispatcher::new(store, messaging.clone());

        let request = NotificationRequest {
            target_role: Some("admin".to_string()),
            ..Default::default()
        };
        let result = dispatcher.dispatch(&request).await;

        assert_eq!(result.success_count, 2);
        assert_eq!(messaging.sent_count(), 2);
    }

    struct BrokenMessagingClient;

    #[async_trait]
    impl MessagingClient for BrokenMessagingClient {
        async fn send(&self, _message: &OutboundMessage) -> Result<(), DeliveryErrorKind> {
            Ok(())
        }

        async fn send_each(
            &self,
            _messages: Vec<OutboundMessage>,
        ) -> Result<DispatchResult, NotifyError> {
            Err(NotifyError::FcmDelivery("transport down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_batch_submission_failure_is_absorbed() {
        let store = Arc::new(MemoryStore::new());
        store.insert("students", "u-1", json!({"fcmToken": "tok-1"}));
        let dispatcher = NotificationDispatcher::new(store, Arc::new(BrokenMessagingClient));

        let result = dispatcher.dispatch(&user_request("u-1")).await;

        assert_eq!(result.success_count, 0);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.failures[0].kind, DeliveryErrorKind::Unavailable);
    }
}
