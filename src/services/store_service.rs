// src/services/store_service.rs
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing;

use crate::errors::NotifyError as AppError;

/// A document read from the store: its id plus decoded fields as plain JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Non-empty string field, or None.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Read-only view of the document store. The store owns all writes; this
/// service only ever performs point reads, full-collection listings and a
/// single-field range query.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError>;
    async fn list(&self, collection: &str) -> Result<Vec<Document>, AppError>;
    async fn query_created_before(
        &self,
        collection: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Document>, AppError>;
}

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub access_token: String,
    pub base_url: String,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: std::env::var("FIRESTORE_PROJECT_ID").unwrap_or_else(|_| "".to_string()),
            access_token: std::env::var("GOOGLE_ACCESS_TOKEN").unwrap_or_else(|_| "".to_string()),
            base_url: "https://firestore.googleapis.com/v1".to_string(),
        }
    }
}

/// Firestore REST client. Documents come back with typed values
/// (stringValue, integerValue, ...) which are flattened to plain JSON
/// before anything else sees them.
pub struct FirestoreStore {
    config: FirestoreConfig,
    client: reqwest::Client,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.config.base_url, self.config.project_id
        )
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, AppError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        let url = format!("{}/{}/{}", self.documents_root(), collection, id);
        let response = self.get_json(&url, &[]).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::store_lookup(format!(
                "GET {}/{} returned {}",
                collection,
                id,
                response.status()
            )));
        }

        let raw: Value = response.json().await?;
        Ok(Some(decode_document(&raw)?))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        let url = format!("{}/{}", self.documents_root(), collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = vec![("pageSize", "300")];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response = self.get_json(&url, &query).await?;
            if !response.status().is_success() {
                return Err(AppError::store_query(format!(
                    "LIST {} returned {}",
                    collection,
                    response.status()
                )));
            }

            let raw: Value = response.json().await?;
            if let Some(page) = raw.get("documents").and_then(Value::as_array) {
                for entry in page {
                    documents.push(decode_document(entry)?);
                }
            }

            match raw.get("nextPageToken").and_then(Value::as_str) {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        tracing::debug!("Listed {} documents from {}", documents.len(), collection);
        Ok(documents)
    }

    async fn query_created_before(
        &self,
        collection: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Document>, AppError> {
        let url = format!("{}:runQuery", self.documents_root());
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "createdAt" },
                        "op": "LESS_THAN_OR_EQUAL",
                        "value": {
                            "timestampValue": cutoff.to_rfc3339_opts(SecondsFormat::Secs, true)
                        }
                    }
                }
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::store_query(format!(
                "runQuery on {} returned {}",
                collection,
                response.status()
            )));
        }

        // runQuery streams one result entry per document; entries without a
        // document key are read-time markers.
        let raw: Value = response.json().await?;
        let mut documents = Vec::new();
        if let Some(entries) = raw.as_array() {
            for entry in entries {
                if let Some(doc) = entry.get("document") {
                    documents.push(decode_document(doc)?);
                }
            }
        }

        tracing::debug!(
            "Range query on {} matched {} documents",
            collection,
            documents.len()
        );
        Ok(documents)
    }
}

/// Flatten a Firestore REST document into id + plain JSON fields.
pub fn decode_document(raw: &Value) -> Result<Document, AppError> {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::DocumentDecode("document has no name".to_string()))?;
    let id = name
        .rsplit('/')
        .next()
        .unwrap_or(name)
        .to_string();

    let mut fields = Map::new();
    if let Some(raw_fields) = raw.get("fields").and_then(Value::as_object) {
        for (key, value) in raw_fields {
            fields.insert(key.clone(), decode_value(value));
        }
    }

    Ok(Document {
        id,
        fields: Value::Object(fields),
    })
}

/// Decode one Firestore typed value into plain JSON. Timestamps stay RFC 3339
/// strings; unknown wrappers decode to null.
pub fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };

    if let Some(s) = obj.get("stringValue").and_then(Value::as_str) {
        return Value::String(s.to_string());
    }
    if let Some(s) = obj.get("timestampValue").and_then(Value::as_str) {
        return Value::String(s.to_string());
    }
    if let Some(s) = obj.get("integerValue").and_then(Value::as_str) {
        return s
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::Null);
    }
    if let Some(n) = obj.get("doubleValue") {
        return n.clone();
    }
    if let Some(b) = obj.get("booleanValue").and_then(Value::as_bool) {
        return Value::Bool(b);
    }
    if obj.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(map) = obj.get("mapValue") {
        let mut fields = Map::new();
        if let Some(inner) = map.get("fields").and_then(Value::as_object) {
            for (key, inner_value) in inner {
                fields.insert(key.clone(), decode_value(inner_value));
            }
        }
        return Value::Object(fields);
    }
    if let Some(array) = obj.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    if let Some(s) = obj.get("referenceValue").and_then(Value::as_str) {
        return Value::String(s.to_string());
    }

    Value::Null
}

/// In-memory store used in tests and as the fallback when no Firestore
/// project is configured. Collections can be marked as failing to exercise
/// lookup-error paths.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, collection: &str, id: &str, fields: Value) {
        let mut collections = self.collections.write().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(id, fields));
    }

    pub fn fail_collection(&self, collection: &str) {
        self.failing.write().unwrap().insert(collection.to_string());
    }

    fn check_failing(&self, collection: &str) -> Result<(), AppError> {
        if self.failing.read().unwrap().contains(collection) {
            return Err(AppError::store_lookup(format!(
                "collection {} unavailable",
                collection
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        self.check_failing(collection)?;
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        self.check_failing(collection)?;
        let collections = self.collections.read().unwrap();
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn query_created_before(
        &self,
        collection: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Document>, AppError> {
        self.check_failing(collection)?;
        let collections = self.collections.read().unwrap();
        let matching = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| {
                        d.str_field("createdAt")
                            .and_then(|s| s.parse::<DateTime<Utc>>().ok())
                            .is_some_and(|created| created <= cutoff)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(matching)
    }
}
