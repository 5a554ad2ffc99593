use crate::aggregator::DataAggregator;
use crate::error::PersonalityError;
use crate::llm_provider::LLMProvider;
use crate::prompt::build_personality_prompt;
use collecthub_core::UserDataSnapshot;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of one successful analysis.
#[derive(Debug, Clone, Serialize)]
pub struct PersonalityAnalysis {
    pub analysis_text: String,
    pub snapshot: UserDataSnapshot,
}

/// Aggregate, build the prompt, ask the provider.
pub struct PersonalityAnalyzer {
    aggregator: DataAggregator,
    provider: Arc<dyn LLMProvider>,
}

impl PersonalityAnalyzer {
    pub fn new(aggregator: DataAggregator, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            aggregator,
            provider,
        }
    }

    pub async fn analyze(
        &self,
        raw_user_id: &str,
    ) -> Result<PersonalityAnalysis, PersonalityError> {
        let snapshot = match self.aggregator.aggregate(raw_user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Data collection failed for user {:?}: {}", raw_user_id, e);
                return Err(e.into());
            }
        };

        let prompt = build_personality_prompt(&snapshot);

        let response = match self.provider.generate(&prompt).await {
            Ok(response) => response,
            Err(e) if e.is_configuration() => {
                error!("{} provider is not configured: {}", self.provider.provider_name(), e);
                return Err(e.into());
            }
            Err(e) => {
                warn!(
                    "{} analysis failed for user {}: {}",
                    self.provider.provider_name(),
                    raw_user_id,
                    e
                );
                return Err(e.into());
            }
        };

        info!(
            "Generated personality analysis for user {} ({} records, model {})",
            raw_user_id,
            snapshot.total_records(),
            response.model
        );

        Ok(PersonalityAnalysis {
            analysis_text: response.content,
            snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AggregationError, AnalysisError};
    use crate::llm_provider::{LLMResponse, LLMResult};
    use async_trait::async_trait;
    use collecthub_core::{
        Book, CollectionModel, DocumentStore, MemoryStore, Quote, RecordId, StoreCollectionReader,
    };
    use std::sync::Mutex;

    enum Reply {
        Text(&'static str),
        MissingKey,
        Status(u16),
    }

    struct RecordingProvider {
        reply: Reply,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.reply {
                Reply::Text(text) => Ok(LLMResponse {
                    content: text.to_string(),
                    finish_reason: None,
                    model: "recording".to_string(),
                }),
                Reply::MissingKey => Err(AnalysisError::MissingCredential),
                Reply::Status(code) => Err(AnalysisError::UpstreamStatus(code)),
            }
        }

        fn provider_name(&self) -> &str {
            "recording"
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    async fn seeded_store(user: RecordId) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let book = Book {
            book_name: "Dune".into(),
            author: "Frank Herbert".into(),
            reason: "epic".into(),
            user_id: Some(user),
            ..Default::default()
        };
        let quote = Quote {
            quote: "Fear is the mind-killer".into(),
            author: "Bene Gesserit".into(),
            user_id: Some(user),
            ..Default::default()
        };
        store
            .insert_one(Book::COLLECTION, book.to_document().unwrap())
            .await
            .unwrap();
        store
            .insert_one(Quote::COLLECTION, quote.to_document().unwrap())
            .await
            .unwrap();
        store
    }

    fn analyzer(store: Arc<MemoryStore>, provider: Arc<RecordingProvider>) -> PersonalityAnalyzer {
        let reader = Arc::new(StoreCollectionReader::new(store));
        PersonalityAnalyzer::new(DataAggregator::new(reader), provider)
    }

    #[tokio::test]
    async fn test_analysis_passes_prompt_through_to_provider() {
        let user = RecordId::new();
        let provider = RecordingProvider::new(Reply::Text("A thoughtful reader."));
        let analyzer = analyzer(seeded_store(user).await, provider.clone());

        let analysis = analyzer.analyze(&user.to_hex()).await.unwrap();
        assert_eq!(analysis.analysis_text, "A thoughtful reader.");
        assert_eq!(analysis.snapshot.books.len(), 1);
        assert_eq!(analysis.snapshot.quotes.len(), 1);

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("**Books:**\n- Dune (Reason: epic)\n"));
        assert!(prompts[0].contains("**Favorite Quotes:**\n- \"Fear is the mind-killer\"\n"));
    }

    #[tokio::test]
    async fn test_invalid_identifier_never_reaches_provider() {
        let provider = RecordingProvider::new(Reply::Text("unused"));
        let analyzer = analyzer(Arc::new(MemoryStore::new()), provider.clone());

        let err = analyzer.analyze("bogus").await.unwrap_err();
        assert!(matches!(
            err,
            PersonalityError::Aggregation(AggregationError::InvalidIdentifier(_))
        ));
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failures_keep_their_kind() {
        let user = RecordId::new();

        let analyzer_missing = analyzer(
            seeded_store(user).await,
            RecordingProvider::new(Reply::MissingKey),
        );
        let err = analyzer_missing.analyze(&user.to_hex()).await.unwrap_err();
        assert!(matches!(
            err,
            PersonalityError::Analysis(AnalysisError::MissingCredential)
        ));

        let analyzer_status = analyzer(
            seeded_store(user).await,
            RecordingProvider::new(Reply::Status(429)),
        );
        let err = analyzer_status.analyze(&user.to_hex()).await.unwrap_err();
        assert!(matches!(
            err,
            PersonalityError::Analysis(AnalysisError::UpstreamStatus(429))
        ));
    }

    struct BrokenReader;

    #[async_trait]
    impl collecthub_core::CollectionReader for BrokenReader {
        async fn fetch_top(
            &self,
            _category: collecthub_core::Category,
            _user_id: collecthub_core::UserId,
            _limit: usize,
        ) -> collecthub_core::Result<Vec<collecthub_core::CategoryRecord>> {
            Err(collecthub_core::CollectHubError::Storage("unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_aggregation_builds_no_prompt() {
        let provider = RecordingProvider::new(Reply::Text("unused"));
        let analyzer = PersonalityAnalyzer::new(
            DataAggregator::new(Arc::new(BrokenReader)),
            provider.clone(),
        );

        let err = analyzer.analyze(&RecordId::new().to_hex()).await.unwrap_err();
        assert!(matches!(
            err,
            PersonalityError::Aggregation(AggregationError::TooManyFailures { .. })
        ));
        assert!(provider.prompts.lock().unwrap().is_empty());
    }
}
