use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{NaaradError, Result};

/// Default backend serving login and alert storage
pub const DEFAULT_API_BASE_URL: &str = "https://naaradupdates.info";

/// Global naarad configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the alerts backend
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Sample-message generation settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// How long fetched RSS items stay cached, in seconds
    #[serde(default = "default_rss_ttl")]
    pub rss_cache_ttl_secs: u64,

    /// Maximum items kept from a single feed
    #[serde(default = "default_items_per_feed")]
    pub rss_items_per_feed: usize,
}

/// Which text generator backs sample messages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Gemini,
    /// Local `claude` CLI
    ClaudeCli,
    /// No generation; every sample is a labelled fallback
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default = "default_model")]
    pub model: String,

    /// API key for hosted providers. `GEMINI_API_KEY` wins when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_rss_ttl() -> u64 {
    300 // 5 minutes
}

fn default_items_per_feed() -> usize {
    10
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            api_key: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            llm: LlmConfig::default(),
            rss_cache_ttl_secs: default_rss_ttl(),
            rss_items_per_feed: default_items_per_feed(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env();
        Ok(config)
    }

    /// Load only what is on disk. Use this before `save()` so environment
    /// overrides are not written back.
    pub fn load_file() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&config_path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `NAARAD_API_URL` and `GEMINI_API_KEY` if present
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("NAARAD_API_URL") {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key.trim().to_string());
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| NaaradError::ConfigError(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "naarad")
            .ok_or_else(|| NaaradError::ConfigError("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "naarad")
            .ok_or_else(|| NaaradError::ConfigError("Could not determine data directory".into()))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the local state database path
    ///
    /// Supports NAARAD_DB environment variable for test isolation
    pub fn db_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("NAARAD_DB") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::data_dir()?.join("naarad.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.rss_cache_ttl_secs, 300);
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[llm]\nprovider = \"claude_cli\"\n").unwrap();
        assert_eq!(config.llm.provider, LlmProvider::ClaudeCli);
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.rss_items_per_feed, 10);
    }
}
