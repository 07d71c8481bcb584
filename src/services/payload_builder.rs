// src/services/payload_builder.rs
use crate::models::notification::{
    MessageData, MessageTemplate, NotificationContent, NotificationRequest, PlatformHints,
};

pub const DEFAULT_TITLE: &str = "New Notification";
pub const DEFAULT_BODY: &str = "You have a new update.";
/// Deep-link handler id expected by the mobile client.
pub const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";
pub const DEFAULT_TYPE: &str = "general";

/// Builds the token-less message template for a request. Pure: same request,
/// same template.
pub struct PayloadBuilder;

impl PayloadBuilder {
    pub fn build(request: &NotificationRequest) -> MessageTemplate {
        MessageTemplate {
            notification: NotificationContent {
                title: non_empty_or(request.title.as_deref(), DEFAULT_TITLE),
                body: non_empty_or(request.body.as_deref(), DEFAULT_BODY),
            },
            hints: PlatformHints::default(),
            data: MessageData {
                click_action: CLICK_ACTION.to_string(),
                ticket_id: request.ticket_id.clone().unwrap_or_default(),
                kind: non_empty_or(request.kind.as_deref(), DEFAULT_TYPE),
            },
        }
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => fallback.to_string(),
    }
}
