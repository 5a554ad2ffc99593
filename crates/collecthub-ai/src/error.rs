use collecthub_core::{Category, CollectHubError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why a single category fetch produced no records.
#[derive(Error, Debug)]
pub enum CategoryFetchError {
    #[error("store error: {0}")]
    Store(#[from] CollectHubError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("fetch task aborted: {0}")]
    Aborted(String),
}

#[derive(Debug)]
pub struct CategoryFailure {
    pub category: Category,
    pub error: CategoryFetchError,
}

impl fmt::Display for CategoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.category, self.error)
    }
}

fn describe_failures(failures: &[CategoryFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("invalid user ID format: {0:?}")]
    InvalidIdentifier(String),

    #[error("too many data collection errors ({} categories failed): {}", .failures.len(), describe_failures(.failures))]
    TooManyFailures { failures: Vec<CategoryFailure> },
}

impl AggregationError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, AggregationError::InvalidIdentifier(_))
    }
}

/// Failures of the generative-text client. Callers collapse these into one
/// user-facing outcome; the variants exist for diagnosis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("analysis API key is not configured (set GEMINI_API_KEY)")]
    MissingCredential,

    #[error("network error calling analysis API: {0}")]
    Network(String),

    #[error("analysis API returned status {0}")]
    UpstreamStatus(u16),

    #[error("malformed analysis API response: {0}")]
    MalformedResponse(String),

    #[error("analysis API returned no content")]
    EmptyCompletion,
}

impl AnalysisError {
    /// Configuration problems recur on every request until fixed.
    pub fn is_configuration(&self) -> bool {
        matches!(self, AnalysisError::MissingCredential)
    }
}

#[derive(Error, Debug)]
pub enum PersonalityError {
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}
