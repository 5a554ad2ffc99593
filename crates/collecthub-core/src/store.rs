//! Document storage.
//!
//! Documents are schemaless JSON objects keyed by an `_id` field holding a
//! [`RecordId`] in hex form. Collections keep insertion order, which is the
//! iteration order every query returns.

use crate::{CollectHubError, RecordId, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::debug;

pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

/// Conjunction of field equality constraints. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    pub fn by_id(id: RecordId) -> Self {
        Self::eq(ID_FIELD, id.to_hex())
    }

    pub fn by_user(user_id: RecordId) -> Self {
        Self::eq("user_id", user_id.to_hex())
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// The `_id` value this filter pins, if any.
    pub(crate) fn pinned_id(&self) -> Option<&str> {
        self.clauses
            .iter()
            .find(|(field, _)| field == ID_FIELD)
            .and_then(|(_, value)| value.as_str())
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document, assigning an `_id` unless it already carries a valid one.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<RecordId>;

    /// Matching documents in collection iteration order.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>>;

    /// Set the given fields on the first matching document.
    async fn update_one(&self, collection: &str, filter: &Filter, set: Document)
        -> Result<UpdateResult>;

    /// Delete the first matching document, returning how many were removed.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64>;
}

/// In-process document store. Contents live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn document_id(document: &Document) -> Option<RecordId> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|raw| RecordId::parse_str(raw).ok())
}

/// Give `document` an `_id` unless it already carries a valid one, and
/// store it in canonical lowercase form.
pub(crate) fn ensure_id(document: &mut Document) -> RecordId {
    let id = document_id(document).unwrap_or_default();
    document.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
    id
}

/// Apply `set` to `document`, never touching `_id`. Returns whether anything changed.
pub(crate) fn apply_set(document: &mut Document, set: Document) -> bool {
    let mut modified = false;
    for (field, value) in set {
        if field == ID_FIELD {
            continue;
        }
        if document.get(&field) != Some(&value) {
            document.insert(field, value);
            modified = true;
        }
    }
    modified
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<RecordId> {
        let id = ensure_id(&mut document);

        let mut docs = self.collections.entry(collection.to_string()).or_default();
        let id_value = Value::String(id.to_hex());
        if docs.iter().any(|d| d.get(ID_FIELD) == Some(&id_value)) {
            return Err(CollectHubError::Storage(format!(
                "duplicate {} {} in collection {}",
                ID_FIELD, id, collection
            )));
        }
        docs.push(document);
        debug!(collection, %id, "inserted document");
        Ok(id)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateResult> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(UpdateResult::default());
        };
        let Some(document) = docs.iter_mut().find(|d| filter.matches(d)) else {
            return Ok(UpdateResult::default());
        };

        let modified = apply_set(document, set);
        Ok(UpdateResult {
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter().position(|d| filter.matches(d)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
