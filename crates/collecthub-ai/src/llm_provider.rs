use crate::AnalysisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for LLM operations
pub type LLMResult<T> = Result<T, AnalysisError>;

/// Response from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Generated text content
    pub content: String,
    /// Finish reason reported by the provider, if any
    pub finish_reason: Option<String>,
    /// Model used for generation
    pub model: String,
}

/// A generative-text backend. One attempt per call; retry policy belongs to callers.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse>;

    /// Get the name of this provider
    fn provider_name(&self) -> &str;

    /// Get the model identifier
    fn model_name(&self) -> &str;
}
