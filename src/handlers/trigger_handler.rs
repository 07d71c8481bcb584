// src/handlers/trigger_handler.rs
use axum::{body::Bytes, extract::State, http::StatusCode};
use std::sync::Arc;
use tracing;

use crate::{models::notification::NotificationRequest, state::AppState};

/// On-create trigger for the "notifications" record stream. Always answers
/// 204: a non-success response would make the platform redeliver the event
/// and duplicate the push.
pub async fn notification_created(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    let request: NotificationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Ignoring malformed trigger payload: {}", e);
            return StatusCode::NO_CONTENT;
        }
    };

    let result = state.dispatcher.dispatch(&request).await;
    tracing::debug!(
        "Trigger handled: {} sent, {} failed",
        result.success_count,
        result.failure_count
    );

    StatusCode::NO_CONTENT
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
