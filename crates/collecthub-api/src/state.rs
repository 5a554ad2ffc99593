use collecthub_ai::{
    DataAggregator, GeminiConfig, GeminiProvider, LLMProvider, PersonalityAnalyzer,
};
use collecthub_core::{
    CollectionReader, ConfigManager, DocumentStore, MemoryStore, PasswordHasher, Settings,
    SqliteStore, StoreCollectionReader,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn DocumentStore>,
    pub analyzer: Arc<PersonalityAnalyzer>,
    pub hasher: PasswordHasher,
    pub started_at: Instant,
}

impl AppState {
    /// Build state from configuration: open the database if one is
    /// configured and wire the Gemini provider.
    pub async fn new(config: Arc<ConfigManager>) -> collecthub_core::Result<Self> {
        let settings = config.settings().clone();

        let store: Arc<dyn DocumentStore> = match &settings.storage.database_path {
            Some(path) => Arc::new(SqliteStore::open(path)?),
            None => {
                warn!("storage.database_path is not set; data is kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let provider = GeminiProvider::new(GeminiConfig::from(&settings.analysis))?;
        if !provider.has_credential() {
            warn!("GEMINI_API_KEY is not set; personality analysis requests will fail");
        }
        info!(
            "Personality analysis via {} model {}",
            provider.provider_name(),
            provider.model_name()
        );

        Ok(Self::with_components(settings, store, Arc::new(provider)))
    }

    pub fn with_components(
        settings: Settings,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn LLMProvider>,
    ) -> Self {
        let reader = Arc::new(StoreCollectionReader::new(store.clone()));
        Self::with_reader(settings, store, reader, provider)
    }

    /// Like [`AppState::with_components`], with analyses reading through
    /// `reader` instead of the store.
    pub fn with_reader(
        settings: Settings,
        store: Arc<dyn DocumentStore>,
        reader: Arc<dyn CollectionReader>,
        provider: Arc<dyn LLMProvider>,
    ) -> Self {
        let aggregator = DataAggregator::from_config(reader, &settings.aggregation);

        Self {
            settings: Arc::new(settings),
            store,
            analyzer: Arc::new(PersonalityAnalyzer::new(aggregator, provider)),
            hasher: PasswordHasher::new(),
            started_at: Instant::now(),
        }
    }
}
