// src/services/token_resolver.rs
use std::sync::Arc;
use tracing;

use crate::{
    errors::NotifyError as AppError,
    models::notification::{NotificationTarget, ResolvedRecipient},
    services::store_service::DocumentStore,
};

/// Field holding the device push token on every user-ish document.
pub const TOKEN_FIELD: &str = "fcmToken";

/// Collections probed for a direct-user lookup, in precedence order. The
/// first collection holding a token for the id wins and probing stops;
/// a user present in several collections is reached through the earliest one.
pub const USER_PROBE_ORDER: [&str; 7] = [
    "students",
    "lecturers",
    "facility_managers",
    "maintenance_supervisors",
    "maintenance",
    "admins",
    "hostel_supervisors",
];

/// Role names accepted in targetRole, each mapped to exactly one collection.
/// Unknown roles resolve to nothing.
pub fn role_collection(role: &str) -> Option<&'static str> {
    match role {
        "facility_manager" => Some("facility_managers"),
        "admin" => Some("admins"),
        "maintenance_supervisor" => Some("maintenance_supervisors"),
        "maintenance_staff" | "maintenance" => Some("maintenance"),
        "lecturer" => Some("lecturers"),
        "hostel_supervisor" => Some("hostel_supervisors"),
        _ => None,
    }
}

/// Resolves a notification target to zero or more device tokens. Lookup
/// errors never abort a resolution; the failing branch just contributes no
/// recipients.
pub struct TokenResolver {
    store: Arc<dyn DocumentStore>,
}

impl TokenResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, target: &NotificationTarget) -> Vec<ResolvedRecipient> {
        if let Some(user_id) = target.user_id.as_deref().filter(|s| !s.is_empty()) {
            self.resolve_user(user_id).await
        } else if let Some(role) = target.role.as_deref().filter(|s| !s.is_empty()) {
            self.resolve_role(role).await
        } else {
            tracing::debug!("Notification carries neither userId nor targetRole");
            Vec::new()
        }
    }

    async fn resolve_user(&self, user_id: &str) -> Vec<ResolvedRecipient> {
        for collection in USER_PROBE_ORDER {
            match self.store.get(collection, user_id).await {
                Ok(Some(doc)) => {
                    if let Some(token) = doc.str_field(TOKEN_FIELD) {
                        tracing::info!("Found token for user {} in {}", user_id, collection);
                        return vec![ResolvedRecipient {
                            token: token.to_string(),
                            source_collection: collection.to_string(),
                        }];
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "Lookup for user {} in {} failed, skipping collection: {}",
                        user_id,
                        collection,
                        e
                    );
                }
            }
        }

        tracing::info!("No token found for user {}", user_id);
        Vec::new()
    }

    async fn resolve_role(&self, role: &str) -> Vec<ResolvedRecipient> {
        let Some(collection) = role_collection(role) else {
            tracing::warn!(
                "Cannot resolve role target: {}",
                AppError::UnmappedRole(role.to_string())
            );
            return Vec::new();
        };

        match self.store.list(collection).await {
            Ok(docs) => {
                let recipients: Vec<ResolvedRecipient> = docs
                    .iter()
                    .filter_map(|doc| {
                        doc.str_field(TOKEN_FIELD).map(|token| ResolvedRecipient {
                            token: token.to_string(),
                            source_collection: collection.to_string(),
                        })
                    })
                    .collect();
                tracing::info!(
                    "Resolved {} recipients for role {} from {}",
                    recipients.len(),
                    role,
                    collection
                );
                recipients
            }
            Err(e) => {
                tracing::warn!("Listing {} for role {} failed: {}", collection, role, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store_service::MemoryStore;
    use serde_json::json;

    fn resolver_with(store: MemoryStore) -> TokenResolver {
        TokenResolver::new(Arc::new(store))
    }

    fn user_target(user_id: &str) -> NotificationTarget {
        NotificationTarget {
            user_id: Some(user_id.to_string()),
            role: None,
        }
    }

    fn role_target(role: &str) -> NotificationTarget {
        NotificationTarget {
            user_id: None,
            role: Some(role.to_string()),
        }
    }

    #[tokio::test]
    async fn test_user_lookup_first_match_wins() {
        let store = MemoryStore::new();
        // Same user id carries a token in two collections; only the earlier
        // collection in the probe order may be used.
        store.insert("lecturers", "u-1", json!({"fcmToken": "tok-lecturer"}));
        store.insert("admins", "u-1", json!({"fcmToken": "tok-admin"}));

        let recipients = resolver_with(store).resolve(&user_target("u-1")).await;
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].token, "tok-lecturer");
        assert_eq!(recipients[0].source_collection, "lecturers");
    }

    #[tokio::test]
    async fn test_user_lookup_skips_docs_without_token() {
        let store = MemoryStore::new();
        store.insert("students", "u-1", json!({"name": "Ama"}));
        store.insert("maintenance", "u-1", json!({"fcmToken": "tok-m"}));

        let recipients = resolver_with(store).resolve(&user_target("u-1")).await;
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].source_collection, "maintenance");
    }

    #[tokio::test]
    async fn test_user_lookup_continues_past_failing_collection() {
        let store = MemoryStore::new();
        store.fail_collection("students");
        store.insert("lecturers", "u-1", json!({"fcmToken": "tok-1"}));

        let recipients = resolver_with(store).resolve(&user_target("u-1")).await;
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].token, "tok-1");
    }

    #[tokio::test]
    async fn test_user_lookup_no_match_returns_empty() {
        let recipients = resolver_with(MemoryStore::new())
            .resolve(&user_target("ghost"))
            .await;
        assert!(recipients.is_empty());
    }

    #[tokio::test]
    async fn test_role_broadcast_collects_all_tokens() {
        let store = MemoryStore::new();
        store.insert("maintenance", "m-1", json!({"fcmToken": "tok-1"}));
        store.insert("maintenance", "m-2", json!({"fcmToken": "tok-2"}));
        store.insert("maintenance", "m-3", json!({"name": "no token"}));

        let recipients = resolver_with(store).resolve(&role_target("maintenance_staff")).await;
        let tokens: Vec<&str> = recipients.iter().map(|r| r.token.as_str()).collect();
        assert_eq!(tokens, vec!["tok-1", "tok-2"]);
    }

    #[tokio::test]
    async fn test_unknown_role_resolves_to_empty() {
        let store = MemoryStore::new();
        store.insert("maintenance", "m-1", json!({"fcmToken": "tok-1"}));

        let recipients = resolver_with(store).resolve(&role_target("unknown_role")).await;
        assert!(recipients.is_empty());
    }

    #[tokio::test]
    async fn test_empty_target_resolves_to_empty() {
        let recipients = resolver_with(MemoryStore::new())
            .resolve(&NotificationTarget::default())
            .await;
        assert!(recipients.is_empty());
    }

    #[test]
    fn test_role_table_covers_known_roles() {
        assert_eq!(role_collection("facility_manager"), Some("facility_managers"));
        assert_eq!(role_collection("maintenance"), Some("maintenance"));
        assert_eq!(role_collection("maintenance_staff"), Some("maintenance"));
        assert_eq!(role_collection("hostel_supervisor"), Some("hostel_supervisors"));
        assert_eq!(role_collection("cleaner"), None);
    }
}
