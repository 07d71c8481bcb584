// src/services/stale_scanner.rs
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing;

use crate::{
    errors::{NotifyError as AppError, NotifyResult},
    models::notification::{MessageTemplate, NotificationRequest},
    models::ticket::Ticket,
    services::{
        messaging_service::MessagingClient,
        payload_builder::PayloadBuilder,
        store_service::{Document, DocumentStore},
        token_resolver::TOKEN_FIELD,
    },
};

pub const REMINDER_TITLE: &str = "Unassigned Ticket Reminder";
pub const REMINDER_TYPE: &str = "stale_assignment_reminder";

/// Which collections the reminder sweep reads and how old an item must be.
/// The two deployment generations differ on both, so the pair is picked by
/// configuration and never merged.
#[derive(Debug, Clone)]
pub struct ReminderPolicy {
    pub work_collection: String,
    pub supervisor_collection: String,
    pub stale_after_days: i64,
}

impl ReminderPolicy {
    /// First-generation deployment: maintenance tickets, supervisors, 2 days.
    pub fn tickets() -> Self {
        Self {
            work_collection: "tickets".to_string(),
            supervisor_collection: "maintenance_supervisors".to_string(),
            stale_after_days: 2,
        }
    }

    /// Second-generation deployment: complaints routed to users, 3 days.
    pub fn complaints() -> Self {
        Self {
            work_collection: "complaints".to_string(),
            supervisor_collection: "users".to_string(),
            stale_after_days: 3,
        }
    }

    pub fn from_env() -> Self {
        match std::env::var("REMINDER_VARIANT").as_deref() {
            Ok("complaints") => Self::complaints(),
            _ => Self::tickets(),
        }
    }
}

/// Periodic sweep over outstanding work items: anything still open, with a
/// responsible supervisor but no staff, created before the staleness cutoff,
/// earns its supervisor one reminder. Eligibility is re-derived from store
/// state every run; there is no dedup state, so back-to-back runs remind
/// again.
pub struct StaleAssignmentScanner {
    store: Arc<dyn DocumentStore>,
    messaging: Arc<dyn MessagingClient>,
    policy: ReminderPolicy,
}

impl StaleAssignmentScanner {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        messaging: Arc<dyn MessagingClient>,
        policy: ReminderPolicy,
    ) -> Self {
        Self {
            store,
            messaging,
            policy,
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) {
        let cutoff = now - Duration::days(self.policy.stale_after_days);
        tracing::info!(
            "Scanning {} for items created before {}",
            self.policy.work_collection,
            cutoff
        );

        // Single range filter; status and assignment checks happen in memory
        // over the result set.
        let documents = match self
            .store
            .query_created_before(&self.policy.work_collection, cutoff)
            .await
        {
            Ok(documents) => documents,
            Err(e) => {
                tracing::error!("Stale assignment query failed: {}", e);
                return;
            }
        };

        let mut sent = 0usize;
        for document in &documents {
            match self.process_item(document, cutoff).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("Skipping work item {}: {}", document.id, e),
            }
        }

        tracing::info!(
            "Stale assignment scan complete: {} candidates, {} reminders sent",
            documents.len(),
            sent
        );
    }

    /// One item, fully isolated: any failure here is reported upward as an
    /// error for the caller to log, never to abort the scan.
    async fn process_item(&self, document: &Document, cutoff: DateTime<Utc>) -> NotifyResult<bool> {
        let ticket = Ticket::from_fields(&document.id, &document.fields)?;
        if !ticket.needs_reminder(cutoff) {
            return Ok(false);
        }
        let Some(supervisor_id) = ticket.assigned_to.as_deref() else {
            return Ok(false);
        };

        let supervisor = self
            .store
            .get(&self.policy.supervisor_collection, supervisor_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "supervisor {} in {}",
                    supervisor_id, self.policy.supervisor_collection
                ))
            })?;

        let token = supervisor.str_field(TOKEN_FIELD).ok_or_else(|| {
            AppError::not_found(format!("token for supervisor {}", supervisor_id))
        })?;

        let message = reminder_message(&ticket).with_token(token);
        self.messaging
            .send(&message)
            .await
            .map_err(|kind| AppError::FcmDelivery(kind.to_string()))?;

        tracing::info!(
            "Reminder sent for work item {} to supervisor {}",
            ticket.id,
            supervisor_id
        );
        Ok(true)
    }
}

fn reminder_message(ticket: &Ticket) -> MessageTemplate {
    let subject = ticket.title.as_deref().unwrap_or("a work item");
    let request = NotificationRequest {
        title: Some(REMINDER_TITLE.to_string()),
        body: Some(format!(
            "{} ({}) has been waiting for staff assignment.",
            subject, ticket.id
        )),
        ticket_id: Some(ticket.id.clone()),
        kind: Some(REMINDER_TYPE.to_string()),
        ..Default::default()
    };
    PayloadBuilder::build(&request)
}
