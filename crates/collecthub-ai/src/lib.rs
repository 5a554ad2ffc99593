pub mod aggregator;
pub mod analyzer;
pub mod error;
pub mod llm_provider;
pub mod prompt;

// Cloud LLM providers
pub mod gemini_provider;

pub use aggregator::DataAggregator;
pub use analyzer::{PersonalityAnalysis, PersonalityAnalyzer};
pub use error::*;
pub use gemini_provider::{GeminiConfig, GeminiProvider};
pub use llm_provider::*;
pub use prompt::build_personality_prompt;
