//! Concurrent collection of a user's top records across every category.
//!
//! One task per category is spawned and joined before anything is folded
//! into the snapshot, so the snapshot has a single writer: the joining task.
//! A task left running after its caller went away (a dropped request future,
//! or a fetch that outlived its timeout) only ever owns its own result.

use crate::error::{AggregationError, CategoryFailure, CategoryFetchError};
use collecthub_core::{
    AggregationConfig, Category, CategoryRecord, CollectionReader, RecordId, UserDataSnapshot,
    UserId,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type FetchOutcome = Result<Vec<CategoryRecord>, CategoryFetchError>;

pub struct DataAggregator {
    reader: Arc<dyn CollectionReader>,
    fetch_timeout: Duration,
    max_failures: usize,
    items_per_category: usize,
}

impl DataAggregator {
    pub fn new(reader: Arc<dyn CollectionReader>) -> Self {
        Self::from_config(reader, &AggregationConfig::default())
    }

    pub fn from_config(reader: Arc<dyn CollectionReader>, config: &AggregationConfig) -> Self {
        Self {
            reader,
            fetch_timeout: config.fetch_timeout(),
            max_failures: config.max_failures,
            items_per_category: config.items_per_category,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_max_failures(mut self, max_failures: usize) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// Parse `raw_user_id` and aggregate. A malformed identifier fails before
    /// any fetch is started.
    pub async fn aggregate(&self, raw_user_id: &str) -> Result<UserDataSnapshot, AggregationError> {
        let user_id = RecordId::parse_str(raw_user_id)
            .map_err(|_| AggregationError::InvalidIdentifier(raw_user_id.to_string()))?;
        self.aggregate_for(user_id).await
    }

    /// Fetch all six categories concurrently and fold the results.
    ///
    /// Succeeds when at most `max_failures` categories failed; failed
    /// categories are left empty in the snapshot.
    pub async fn aggregate_for(
        &self,
        user_id: UserId,
    ) -> Result<UserDataSnapshot, AggregationError> {
        let start = Instant::now();

        let (categories, handles): (Vec<Category>, Vec<JoinHandle<FetchOutcome>>) = Category::ALL
            .iter()
            .map(|&category| (category, self.spawn_fetch(category, user_id)))
            .unzip();

        let outcomes = join_all(handles).await;

        let mut snapshot = UserDataSnapshot::new();
        let mut failures = Vec::new();
        for (category, joined) in categories.into_iter().zip(outcomes) {
            let outcome =
                joined.unwrap_or_else(|e| Err(CategoryFetchError::Aborted(e.to_string())));
            match outcome {
                Ok(records) => {
                    debug!("Collected {} {} records", records.len(), category);
                    snapshot.set(category, records);
                }
                Err(error) => {
                    warn!("Failed to collect {} for user {}: {}", category, user_id, error);
                    failures.push(CategoryFailure { category, error });
                }
            }
        }

        if failures.len() > self.max_failures {
            return Err(AggregationError::TooManyFailures { failures });
        }

        if snapshot.is_empty() {
            debug!("User {} has no records in any category", user_id);
        }
        info!(
            "Aggregated {} records for user {} in {:?} ({} categories failed)",
            snapshot.total_records(),
            user_id,
            start.elapsed(),
            failures.len()
        );
        Ok(snapshot)
    }

    fn spawn_fetch(&self, category: Category, user_id: UserId) -> JoinHandle<FetchOutcome> {
        let reader = Arc::clone(&self.reader);
        let timeout = self.fetch_timeout;
        let limit = self.items_per_category;

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, reader.fetch_top(category, user_id, limit)).await {
                Ok(result) => result.map_err(CategoryFetchError::from),
                Err(_) => Err(CategoryFetchError::Timeout(timeout)),
            }
        })
    }
}
