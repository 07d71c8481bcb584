// src/models/ticket.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{NotifyError, NotifyResult};

/// Statuses that close a work item. Closed items never get reminders.
pub const TERMINAL_STATUSES: [&str; 2] = ["Resolved", "Completed"];

/// A maintenance work item (ticket or complaint, depending on deployment)
/// as stored in the document store.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    /// Supervisor responsible for staffing the item.
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Staff member actually working the item, set once staffed.
    #[serde(default)]
    pub assigned_staff_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Ticket {
    /// Decode a ticket from raw document fields, stamping the document id.
    pub fn from_fields(id: &str, fields: &Value) -> NotifyResult<Self> {
        let mut ticket: Ticket = serde_json::from_value(fields.clone())
            .map_err(|e| NotifyError::DocumentDecode(format!("work item {}: {}", id, e)))?;
        ticket.id = id.to_string();
        Ok(ticket)
    }

    pub fn is_terminal(&self) -> bool {
        TERMINAL_STATUSES.contains(&self.status.as_str())
    }

    pub fn is_staffed(&self) -> bool {
        self.assigned_staff_id
            .as_deref()
            .is_some_and(|s| !s.is_empty())
    }

    /// Reminder eligibility is a pure function of current state: the item is
    /// still open, a supervisor is responsible, nobody is staffed on it yet,
    /// and it was created at or before the staleness cutoff.
    pub fn needs_reminder(&self, cutoff: DateTime<Utc>) -> bool {
        !self.is_terminal()
            && self.assigned_to.as_deref().is_some_and(|s| !s.is_empty())
            && !self.is_staffed()
            && self.created_at <= cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn base_ticket(created_days_ago: i64) -> Ticket {
        Ticket {
            id: "t-1".to_string(),
            status: "pending".to_string(),
            assigned_to: Some("sup1".to_string()),
            assigned_staff_id: None,
            created_at: Utc::now() - Duration::days(created_days_ago),
            title: None,
        }
    }

    fn cutoff_days_ago(days: i64) -> DateTime<Utc> {
        Utc::now() - Duration::days(days)
    }

    #[test]
    fn test_stale_unstaffed_ticket_needs_reminder() {
        let ticket = base_ticket(3);
        assert!(ticket.needs_reminder(cutoff_days_ago(2)));
    }

    #[test]
    fn test_terminal_status_is_not_eligible() {
        for status in TERMINAL_STATUSES {
            let mut ticket = base_ticket(3);
            ticket.status = status.to_string();
            assert!(!ticket.needs_reminder(cutoff_days_ago(2)), "status {}", status);
        }
    }

    #[test]
    fn test_unassigned_ticket_is_not_eligible() {
        let mut ticket = base_ticket(3);
        ticket.assigned_to = None;
        assert!(!ticket.needs_reminder(cutoff_days_ago(2)));

        ticket.assigned_to = Some(String::new());
        assert!(!ticket.needs_reminder(cutoff_days_ago(2)));
    }

    #[test]
    fn test_staffed_ticket_is_not_eligible() {
        let mut ticket = base_ticket(3);
        ticket.assigned_staff_id = Some("staff-9".to_string());
        assert!(!ticket.needs_reminder(cutoff_days_ago(2)));
    }

    #[test]
    fn test_recent_ticket_is_not_eligible() {
        let ticket = base_ticket(1);
        assert!(!ticket.needs_reminder(cutoff_days_ago(2)));
    }

    #[test]
    fn test_from_fields_decodes_store_schema() {
        let fields = json!({
            "status": "pending",
            "assignedTo": "sup1",
            "createdAt": "2025-08-01T08:00:00Z",
            "title": "Broken window"
        });

        let ticket = Ticket::from_fields("t-9", &fields).unwrap();
        assert_eq!(ticket.id, "t-9");
        assert_eq!(ticket.assigned_to.as_deref(), Some("sup1"));
        assert!(!ticket.is_staffed());
    }

    #[test]
    fn test_from_fields_rejects_missing_created_at() {
        let fields = json!({ "status": "pending" });
        assert!(Ticket::from_fields("t-9", &fields).is_err());
    }
}
