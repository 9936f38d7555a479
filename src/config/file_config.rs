//! Configuration file support.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! api_key = "your-api-key"
//! endpoint = "https://api.materialsproject.org/"
//! include_user_agent = true
//! timeout_secs = 30
//!
//! [query]
//! chunk_size = 1000
//! max_tries_per_chunk = 3
//! id_page_size = 10000
//!
//! [retry]
//! initial_delay_ms = 500
//! max_delay_ms = 10000
//! backoff_multiplier = 2.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{ApiConfig, Config, QueryConfig, RetryPolicyConfig};

/// Configuration file structure
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub retry: RetryPolicyConfig,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }

    /// Convert to the runtime configuration
    pub fn into_config(self) -> Config {
        Config {
            api: self.api,
            query: self.query,
            retry: self.retry,
        }
    }
}

impl From<&Config> for ConfigFile {
    fn from(config: &Config) -> Self {
        Self {
            api: config.api.clone(),
            query: config.query.clone(),
            retry: config.retry.clone(),
        }
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
