// src/models/notification.rs
use serde::{Deserialize, Serialize};

use crate::models::delivery::{DeliveryErrorKind, SendFailure};

/// A newly created notification record, as written by the mobile/web clients
/// into the "notifications" collection. Field names follow the store schema.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub user_id: Option<String>,
    pub target_role: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub ticket_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Who a notification should go to. At most one of the two fields is
/// expected to be set; neither set resolves to zero recipients.
#[derive(Debug, Clone, Default)]
pub struct NotificationTarget {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

impl From<&NotificationRequest> for NotificationTarget {
    fn from(request: &NotificationRequest) -> Self {
        Self {
            user_id: request.user_id.clone(),
            role: request.target_role.clone(),
        }
    }
}

/// A device token resolved for delivery, tagged with the collection it came
/// from. Duplicate tokens across collections are kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecipient {
    pub token: String,
    pub source_collection: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

/// Fixed cross-platform delivery hints. Priority is always high and sound
/// always default so alerts are audible on both Android and iOS.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlatformHints {
    pub android_priority: String,
    pub android_sound: String,
    pub apns_sound: String,
}

impl Default for PlatformHints {
    fn default() -> Self {
        Self {
            android_priority: "HIGH".to_string(),
            android_sound: "default".to_string(),
            apns_sound: "default".to_string(),
        }
    }
}

/// Custom key/value payload consumed by the client-side notification handler.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MessageData {
    pub click_action: String,
    #[serde(rename = "ticketId")]
    pub ticket_id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A fully built notification payload, minus the destination token.
/// Merging a token yields one OutboundMessage per recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageTemplate {
    pub notification: NotificationContent,
    pub hints: PlatformHints,
    pub data: MessageData,
}

impl MessageTemplate {
    pub fn with_token(self, token: &str) -> OutboundMessage {
        OutboundMessage {
            token: token.to_string(),
            notification: self.notification,
            hints: self.hints,
            data: self.data,
        }
    }
}

/// One push message addressed to a single device token.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub token: String,
    pub notification: NotificationContent,
    pub hints: PlatformHints,
    pub data: MessageData,
}

/// Aggregated outcome of a fan-out. Failures keep the order in which the
/// messages were submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub failures: Vec<SendFailure>,
}

impl DispatchResult {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, token: impl Into<String>, kind: DeliveryErrorKind) {
        self.failure_count += 1;
        self.failures.push(SendFailure {
            token: token.into(),
            kind,
        });
    }
}
