//! SQLite-backed [`DocumentStore`].
//!
//! Documents are stored as JSON text in one table. `seq` keeps per-collection
//! insertion order, and every write is committed before the call returns.

use crate::store::{
    apply_set, ensure_id, Document, DocumentStore, Filter, UpdateResult, ID_FIELD,
};
use crate::{CollectHubError, RecordId, Result};
use async_trait::async_trait;
use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::Path;
use tracing::{debug, info};

type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    body       TEXT NOT NULL,
    UNIQUE (collection, id)
);
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection, seq);
";

/// Per-connection pragmas.
#[derive(Debug)]
struct SqlitePragmaCustomizer;

impl CustomizeConnection<Connection, rusqlite::Error> for SqlitePragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            "PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open the database at `path`, creating the file and schema if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!(path = %path.display(), "Opening document database");

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(8)
            .connection_customizer(Box::new(SqlitePragmaCustomizer))
            .build(manager)?;

        {
            let conn = pool.get()?;
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            conn.execute_batch(SCHEMA)?;
        }

        Ok(Self { pool })
    }

    /// Run `op` against a pooled connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            op(&mut conn)
        })
        .await
        .map_err(|e| CollectHubError::Storage(format!("store task failed: {}", e)))?
    }
}

/// Documents of `collection` matching `filter`, with their row sequence, in
/// insertion order. Stops after the first match when `first_only` is set.
fn matching(
    conn: &Connection,
    collection: &str,
    filter: &Filter,
    first_only: bool,
) -> Result<Vec<(i64, Document)>> {
    let mut stmt = conn.prepare_cached(
        "SELECT seq, body FROM documents
         WHERE collection = ?1 AND (?2 IS NULL OR id = ?2)
         ORDER BY seq",
    )?;
    let rows = stmt.query_map(params![collection, filter.pinned_id()], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut found = Vec::new();
    for row in rows {
        let (seq, body) = row?;
        let document: Document = serde_json::from_str(&body)?;
        if filter.matches(&document) {
            found.push((seq, document));
            if first_only {
                break;
            }
        }
    }
    Ok(found)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<RecordId> {
        let id = ensure_id(&mut document);
        let body = serde_json::to_string(&document)?;
        let collection = collection.to_string();

        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
                params![collection, id.to_hex(), body],
            )?;
            if inserted == 0 {
                return Err(CollectHubError::Storage(format!(
                    "duplicate {} {} in collection {}",
                    ID_FIELD, id, collection
                )));
            }
            debug!(collection = %collection, %id, "inserted document");
            Ok(id)
        })
        .await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.with_conn(move |conn| {
            Ok(matching(conn, &collection, &filter, false)?
                .into_iter()
                .map(|(_, document)| document)
                .collect())
        })
        .await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.with_conn(move |conn| {
            Ok(matching(conn, &collection, &filter, true)?
                .into_iter()
                .next()
                .map(|(_, document)| document))
        })
        .await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateResult> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let first = matching(&tx, &collection, &filter, true)?.into_iter().next();
            let Some((seq, mut document)) = first else {
                return Ok(UpdateResult::default());
            };

            let modified = apply_set(&mut document, set);
            if modified {
                tx.execute(
                    "UPDATE documents SET body = ?1 WHERE seq = ?2",
                    params![serde_json::to_string(&document)?, seq],
                )?;
            }
            tx.commit()?;

            Ok(UpdateResult {
                matched_count: 1,
                modified_count: u64::from(modified),
            })
        })
        .await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let first = matching(&tx, &collection, &filter, true)?.into_iter().next();
            let Some((seq, _)) = first else {
                return Ok(0);
            };

            tx.execute("DELETE FROM documents WHERE seq = ?1", params![seq])?;
            tx.commit()?;
            Ok(1)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn open_temp() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("collecthub.db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("collecthub.db");

        let (kept, removed) = {
            let store = SqliteStore::open(&path).unwrap();
            let kept = store
                .insert_one("quotes", doc(json!({"quote": "Stay hungry"})))
                .await
                .unwrap();
            let removed = store
                .insert_one("quotes", doc(json!({"quote": "Stay foolish"})))
                .await
                .unwrap();
            store
                .update_one("quotes", &Filter::by_id(kept), doc(json!({"author": "Jobs"})))
                .await
                .unwrap();
            store.delete_one("quotes", &Filter::by_id(removed)).await.unwrap();
            (kept, removed)
        };

        let reopened = SqliteStore::open(&path).unwrap();
        let quotes = reopened.find("quotes", &Filter::all()).await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0]["_id"], kept.to_hex());
        assert_eq!(quotes[0]["author"], "Jobs");
        assert!(reopened
            .find_one("quotes", &Filter::by_id(removed))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_find_filters_in_insertion_order() {
        let (_dir, store) = open_temp();
        let user = RecordId::new();
        let other = RecordId::new();
        for (name, owner) in [("a", user), ("x", other), ("b", user), ("c", user)] {
            store
                .insert_one("books", doc(json!({"book_name": name, "user_id": owner.to_hex()})))
                .await
                .unwrap();
        }

        let found = store.find("books", &Filter::by_user(user)).await.unwrap();
        let names: Vec<_> = found.iter().map(|d| d["book_name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let first = store
            .find_one("books", &Filter::by_user(user).and("book_name", "b"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first["book_name"], "b");
        assert!(store.find("movies", &Filter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected_per_collection() {
        let (_dir, store) = open_temp();
        let id = RecordId::new();
        let document = doc(json!({"_id": id.to_hex().to_uppercase(), "name": "x"}));

        assert_eq!(store.insert_one("users", document.clone()).await.unwrap(), id);
        assert!(matches!(
            store.insert_one("users", document.clone()).await,
            Err(CollectHubError::Storage(_))
        ));
        assert_eq!(store.insert_one("pets", document).await.unwrap(), id);

        let stored = store.find_one("users", &Filter::by_id(id)).await.unwrap().unwrap();
        assert_eq!(stored["_id"], id.to_hex());
    }

    #[tokio::test]
    async fn test_update_reports_match_and_modification() {
        let (_dir, store) = open_temp();
        let id = store
            .insert_one("pets", doc(json!({"name": "Rex", "reason": "loyal"})))
            .await
            .unwrap();

        let changed = store
            .update_one("pets", &Filter::by_id(id), doc(json!({"reason": "very loyal"})))
            .await
            .unwrap();
        assert_eq!(changed, UpdateResult { matched_count: 1, modified_count: 1 });

        let unchanged = store
            .update_one("pets", &Filter::by_id(id), doc(json!({"reason": "very loyal"})))
            .await
            .unwrap();
        assert_eq!(unchanged, UpdateResult { matched_count: 1, modified_count: 0 });

        let missing = store
            .update_one("pets", &Filter::by_id(RecordId::new()), doc(json!({"reason": "x"})))
            .await
            .unwrap();
        assert_eq!(missing, UpdateResult::default());

        let id_untouched = store
            .update_one("pets", &Filter::by_id(id), doc(json!({"_id": RecordId::new().to_hex()})))
            .await
            .unwrap();
        assert_eq!(id_untouched.modified_count, 0);
        assert!(store.find_one("pets", &Filter::by_id(id)).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_all_land() {
        let (_dir, store) = open_temp();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..24)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.insert_one("movies", doc(json!({"title": format!("m{}", i)}))).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.find("movies", &Filter::all()).await.unwrap().len(), 24);
    }
}
