use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config as cfg;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable consulted for the analysis credential when the
/// configuration does not carry one.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// SQLite database file. `None` keeps every collection in memory for the
    /// lifetime of the process.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Timeout applied to each category fetch independently.
    #[serde(default = "AggregationConfig::default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// The analysis fails once more than this many category fetches fail.
    #[serde(default = "AggregationConfig::default_max_failures")]
    pub max_failures: usize,
    #[serde(default = "AggregationConfig::default_items_per_category")]
    pub items_per_category: usize,
}

impl AggregationConfig {
    fn default_fetch_timeout_secs() -> u64 {
        10
    }

    fn default_max_failures() -> usize {
        3
    }

    fn default_items_per_category() -> usize {
        crate::MAX_ITEMS_PER_CATEGORY
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: Self::default_fetch_timeout_secs(),
            max_failures: Self::default_max_failures(),
            items_per_category: Self::default_items_per_category(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "AnalysisConfig::default_api_base")]
    pub api_base: String,
    #[serde(default = "AnalysisConfig::default_model")]
    pub model: String,
    #[serde(default = "AnalysisConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    // Never serialized; read from config sources or GEMINI_API_KEY.
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,
}

impl AnalysisConfig {
    fn default_api_base() -> String {
        "https://generativelanguage.googleapis.com/v1beta".to_string()
    }

    fn default_model() -> String {
        "gemini-2.0-flash".to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured key, falling back to `GEMINI_API_KEY`. Empty keys count as absent.
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        self.api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .or_else(|| {
                env::var(GEMINI_API_KEY_ENV)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .map(SecretString::from)
            })
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_base: Self::default_api_base(),
            model: Self::default_model(),
            timeout_secs: Self::default_timeout_secs(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            aggregation: AggregationConfig::default(),
            analysis: AnalysisConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    fn default_env() -> String {
        env::var("APP_ENV")
            .ok()
            .or_else(|| env::var("RUST_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.server.host.trim().is_empty(),
            "server.host cannot be empty"
        );
        anyhow::ensure!(self.server.port > 0, "server.port must be > 0");
        anyhow::ensure!(
            self.aggregation.fetch_timeout_secs > 0,
            "aggregation.fetch_timeout_secs must be > 0"
        );
        anyhow::ensure!(
            self.aggregation.items_per_category > 0,
            "aggregation.items_per_category must be > 0"
        );
        anyhow::ensure!(
            self.analysis.timeout_secs > 0,
            "analysis.timeout_secs must be > 0"
        );
        anyhow::ensure!(
            !self.analysis.api_base.trim().is_empty(),
            "analysis.api_base cannot be empty"
        );
        anyhow::ensure!(
            !self.analysis.model.trim().is_empty(),
            "analysis.model cannot be empty"
        );
        Ok(())
    }
}

/// Loads [`Settings`] from layered sources.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    settings: Settings,
}

impl ConfigManager {
    /// Load and validate settings. `config_dir` defaults to
    /// [`ConfigManager::default_config_dir`].
    pub fn load(config_dir: Option<PathBuf>, env_override: Option<String>) -> Result<Self> {
        let config_dir = Self::get_config_dir(config_dir);
        let env_name = env_override.unwrap_or_else(Settings::default_env);
        let mut settings = Self::load_from_sources(&config_dir, &env_name)?;
        settings.env = env_name;
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Wrap already-built settings, e.g. in tests.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Get the default configuration directory.
    ///
    /// Priority order:
    /// 1. ~/.collecthub/ (user-level config)
    /// 2. ./config/ (project-level config)
    /// 3. Current directory (fallback)
    pub fn default_config_dir() -> PathBuf {
        if let Some(home_dir) = dirs::home_dir() {
            let user_dir = home_dir.join(".collecthub");
            if user_dir.exists() {
                info!("Using config directory: {:?}", user_dir);
                return user_dir;
            }
        }

        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let project_config = cwd.join("config");
        if project_config.exists() {
            info!("Using config directory: {:?}", project_config);
            return project_config;
        }

        info!("Using config directory: {:?}", cwd);
        cwd
    }

    pub fn get_config_dir(custom_path: Option<PathBuf>) -> PathBuf {
        custom_path.unwrap_or_else(Self::default_config_dir)
    }

    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Settings> {
        let settings: Settings = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(cfg::File::from(config_dir.join("default.yaml")).required(false))
            .add_source(cfg::File::from(config_dir.join("default.json")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.yaml", env_name))).required(false),
            )
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.json", env_name))).required(false),
            )
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                cfg::Environment::with_prefix("COLLECTHUB")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        Ok(settings)
    }
}
