pub mod config;
pub mod error;
pub mod models;
pub mod reader;
pub mod record_id;
pub mod security;
pub mod sqlite_store;
pub mod store;
pub mod types;

pub use config::{
    AggregationConfig, AnalysisConfig, ConfigManager, LoggingConfig, ServerConfig, Settings,
    StorageConfig, GEMINI_API_KEY_ENV,
};
pub use error::*;
pub use models::*;
pub use reader::*;
pub use record_id::*;
pub use security::*;
pub use sqlite_store::SqliteStore;
pub use store::*;
pub use types::*;
