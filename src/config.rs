use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Search engine connection
    pub engine: EngineConfig,

    /// Source dataset
    pub dataset: DatasetConfig,

    /// Import and initialization retry settings
    #[serde(default)]
    pub import: ImportConfig,

    /// Query sizing
    #[serde(default)]
    pub search: SearchConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: MEDSEARCH_)
            .add_source(
                config::Environment::with_prefix("MEDSEARCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EngineBackend {
    #[default]
    Elasticsearch,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine implementation
    #[serde(default)]
    pub backend: EngineBackend,

    /// Base URL of the cluster
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Target index name
    #[serde(default = "default_index")]
    pub index: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,
}

impl EngineConfig {
    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_ref()
            .and_then(|env_var| std::env::var(env_var).ok())
            .filter(|key| !key.is_empty())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: EngineBackend::default(),
            url: default_engine_url(),
            api_key_env: Some("ELASTICSEARCH_API_KEY".to_string()),
            index: default_index(),
            timeout_secs: default_engine_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path of the delimited dataset file
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Records per bulk request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Initialization attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (seconds)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl ImportConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Distinct values requested per facet field
    #[serde(default = "default_facet_size")]
    pub facet_size: usize,

    /// Completions requested per autocomplete call
    #[serde(default = "default_suggestion_size")]
    pub suggestion_size: usize,

    /// Hits returned per search
    #[serde(default = "default_max_hits")]
    pub max_hits: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            facet_size: default_facet_size(),
            suggestion_size: default_suggestion_size(),
            max_hits: default_max_hits(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_engine_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "medicines".to_string()
}

fn default_engine_timeout() -> u64 {
    30
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/medicines.csv")
}

fn default_batch_size() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_facet_size() -> usize {
    1000
}

fn default_suggestion_size() -> usize {
    10
}

fn default_max_hits() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_port(), 3001);
        assert_eq!(default_index(), "medicines");
        assert_eq!(default_batch_size(), 100);
        assert_eq!(default_max_attempts(), 3);
        assert_eq!(default_retry_delay(), 5);
        assert!(default_true());
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 3001);
        assert_eq!(config.engine.backend, EngineBackend::Elasticsearch);
        assert_eq!(config.engine.index, "medicines");
        assert_eq!(config.import.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.search.facet_size, 1000);
        assert_eq!(config.search.suggestion_size, 10);
    }

    #[test]
    fn test_api_key_from_env() {
        let engine = EngineConfig {
            api_key_env: Some("MEDSEARCH_TEST_API_KEY_UNSET".to_string()),
            ..Default::default()
        };
        assert!(engine.api_key().is_none());

        let engine = EngineConfig {
            api_key_env: None,
            ..Default::default()
        };
        assert!(engine.api_key().is_none());
    }
}
