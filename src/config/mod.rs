//! Configuration management.
//!
//! Environment lookup happens here and nowhere else: the library takes a
//! [`Config`] value and never reads the environment on its own.

mod file_config;

pub use file_config::{ConfigFile, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::QuerySettings;
use crate::utils::{HttpSettings, RetryConfig};

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.materialsproject.org/";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "MP_API_KEY";

/// Environment variable overriding the endpoint
pub const ENDPOINT_ENV: &str = "MP_API_ENDPOINT";

/// Name of the configuration file looked up by [`find_config_file`]
pub const CONFIG_FILE_NAME: &str = "mp-rester.toml";

/// Client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint and credentials
    #[serde(default)]
    pub api: ApiConfig,

    /// Chunking
    #[serde(default)]
    pub query: QueryConfig,

    /// Backoff between attempts
    #[serde(default)]
    pub retry: RetryPolicyConfig,
}

/// API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Send a `mp-rester/<version>` user agent
    #[serde(default = "default_true")]
    pub include_user_agent: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            include_user_agent: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

/// Chunked query settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Identifiers per chunk; 0 disables chunking
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_max_tries")]
    pub max_tries_per_chunk: u32,

    #[serde(default = "default_id_page_size")]
    pub id_page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_tries_per_chunk: default_max_tries(),
            id_page_size: default_id_page_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_max_tries() -> u32 {
    3
}

fn default_id_page_size() -> usize {
    10_000
}

/// Exponential backoff settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Config {
    /// Defaults with the key and endpoint taken from `MP_API_KEY` and
    /// `MP_API_ENDPOINT`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Configuration with an explicit key and the default endpoint
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.api.api_key = Some(api_key.into());
        config
    }

    /// Override the key and endpoint from the environment when set
    pub fn apply_env(&mut self) {
        if let Some(key) = env_value(API_KEY_ENV) {
            self.api.api_key = Some(key);
        }
        if let Some(endpoint) = env_value(ENDPOINT_ENV) {
            self.api.endpoint = endpoint;
        }
    }

    /// Settings for the chunked executor
    pub fn to_query_settings(&self) -> QuerySettings {
        let retry = RetryConfig {
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
            ..RetryConfig::default()
        };

        QuerySettings {
            chunk_size: self.query.chunk_size,
            max_tries_per_chunk: self.query.max_tries_per_chunk.max(1),
            id_page_size: self.query.id_page_size.max(1),
            retry,
        }
    }

    /// Settings for the HTTP transport
    pub fn to_http_settings(&self) -> HttpSettings {
        HttpSettings {
            endpoint: self.api.endpoint.clone(),
            api_key: self.api.api_key.clone(),
            include_user_agent: self.api.include_user_agent,
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Load configuration from a file, layered under `MP_API_*` environment
/// overrides. Nested keys use a double underscore, e.g.
/// `MP_API_QUERY__CHUNK_SIZE=500`.
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("MP_API")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    config.apply_env();
    Ok(config)
}

/// Look for `mp-rester.toml` in the working directory, then in the user
/// configuration directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("mp-rester").join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// The configuration file if one is found, otherwise the environment
pub fn get_config() -> Result<Config, config::ConfigError> {
    match find_config_file() {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration file");
            load_config(&path)
        }
        None => Ok(Config::from_env()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.query.chunk_size, 1000);
        assert_eq!(config.query.max_tries_per_chunk, 3);
        assert!(config.api.include_user_agent);
    }

    #[test]
    fn test_settings_conversion() {
        let mut config = Config::with_api_key("abc");
        config.query.chunk_size = 250;
        config.query.max_tries_per_chunk = 0;
        config.retry.initial_delay_ms = 100;

        let query = config.to_query_settings();
        assert_eq!(query.chunk_size, 250);
        assert_eq!(query.max_tries_per_chunk, 1);
        assert_eq!(query.retry.initial_delay, Duration::from_millis(100));

        let http = config.to_http_settings();
        assert_eq!(http.api_key.as_deref(), Some("abc"));
        assert_eq!(http.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mp-rester.toml");
        std::fs::write(
            &path,
            r#"
[api]
endpoint = "https://example.org/api/"
timeout_secs = 5

[query]
chunk_size = 0
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.query.chunk_size, 0);
        assert_eq!(config.query.id_page_size, 10_000);
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.retry, RetryPolicyConfig::default());
    }
}
