// src/state.rs
use std::sync::Arc;
use tracing;

use crate::services::{
    dispatcher::NotificationDispatcher,
    messaging_service::{FcmClient, FcmConfig, MessagingClient, MockMessagingClient},
    stale_scanner::{ReminderPolicy, StaleAssignmentScanner},
    store_service::{DocumentStore, FirestoreConfig, FirestoreStore, MemoryStore},
};

/// Process-wide immutable handles, constructed once at startup and injected
/// into every component.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub messaging: Arc<dyn MessagingClient>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub scanner: Arc<StaleAssignmentScanner>,
    pub config: AppConfig,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub firestore: FirestoreConfig,
    pub fcm: FcmConfig,
    pub reminder_policy: ReminderPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            firestore: FirestoreConfig::default(),
            fcm: FcmConfig::default(),
            reminder_policy: ReminderPolicy::from_env(),
        }
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store: Arc<dyn DocumentStore> = if config.firestore.project_id.is_empty() {
            tracing::warn!("FIRESTORE_PROJECT_ID not set, using in-memory document store");
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(FirestoreStore::new(config.firestore.clone()))
        };

        let messaging: Arc<dyn MessagingClient> = if config.fcm.access_token.is_empty() {
            tracing::warn!("FCM_ACCESS_TOKEN not set, using mock messaging client");
            Arc::new(MockMessagingClient::new())
        } else {
            Arc::new(FcmClient::new(config.fcm.clone()))
        };

        let dispatcher = Arc::new(NotificationDispatcher::new(store.clone(), messaging.clone()));
        let scanner = Arc::new(StaleAssignmentScanner::new(
            store.clone(),
            messaging.clone(),
            config.reminder_policy.clone(),
        ));

        Self {
            store,
            messaging,
            dispatcher,
            scanner,
            config,
        }
    }
}
