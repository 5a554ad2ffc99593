use crate::{Category, CategoryRecord, DocumentStore, Filter, Result, UserId};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Read access to a user's records in one category.
#[async_trait]
pub trait CollectionReader: Send + Sync {
    /// Up to `limit` records for `user_id`, in store iteration order.
    async fn fetch_top(
        &self,
        category: Category,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<CategoryRecord>>;
}

/// [`CollectionReader`] backed by a [`DocumentStore`].
#[derive(Clone)]
pub struct StoreCollectionReader {
    store: Arc<dyn DocumentStore>,
}

impl StoreCollectionReader {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

/// Normalize a stored document into the record shape of `category`.
///
/// Absent or null fields become empty strings. A field holding anything other
/// than a string makes the whole document undecodable.
pub fn decode_record(
    category: Category,
    document: &serde_json::Map<String, Value>,
) -> Option<CategoryRecord> {
    let mut record = CategoryRecord::new();
    for field in category.fields() {
        let value = match document.get(*field) {
            None | Some(Value::Null) => "",
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return None,
        };
        record.insert(*field, value);
    }
    Some(record)
}

#[async_trait]
impl CollectionReader for StoreCollectionReader {
    async fn fetch_top(
        &self,
        category: Category,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<CategoryRecord>> {
        let documents = self
            .store
            .find(category.collection(), &Filter::by_user(user_id))
            .await?;

        let scanned = documents.len();
        let records: Vec<CategoryRecord> = documents
            .iter()
            .filter_map(|doc| decode_record(category, doc))
            .take(limit)
            .collect();

        debug!(
            %category,
            %user_id,
            scanned,
            returned = records.len(),
            "fetched top records"
        );
        Ok(records)
    }
}
