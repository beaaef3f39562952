//! Client configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/postlist/config.toml)
//! 3. Environment variables (POSTLIST_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
const ENV_PREFIX: &str = "POSTLIST";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint used when no URL is given explicitly
    #[serde(default)]
    pub default_url: Option<String>,

    /// Directory for client state (session file)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of ancestors kept in a status history (unbounded if unset)
    #[serde(default)]
    pub history_limit: Option<usize>,

    /// Record data and extra alongside each history entry
    #[serde(default)]
    pub capture_history_data: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_url: None,
            data_dir: default_data_dir(),
            timeout_secs: default_timeout_secs(),
            history_limit: None,
            capture_history_data: false,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (POSTLIST_URL, POSTLIST_DATA_DIR, ...)
    /// 2. Config file (~/.config/postlist/config.toml or POSTLIST_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Read only the config file, without environment overrides
    ///
    /// Use this when the result is going to be saved back to the file.
    /// Defaults are used if the file doesn't exist.
    pub fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // POSTLIST_URL
        if let Ok(val) = std::env::var(format!("{}_URL", ENV_PREFIX)) {
            self.default_url = if val.is_empty() { None } else { Some(val) };
        }

        // POSTLIST_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // POSTLIST_TIMEOUT
        if let Ok(val) = std::env::var(format!("{}_TIMEOUT", ENV_PREFIX)) {
            self.timeout_secs = val
                .parse()
                .with_context(|| format!("Invalid {}_TIMEOUT: {:?}", ENV_PREFIX, val))?;
        }

        // POSTLIST_HISTORY_LIMIT
        if let Ok(val) = std::env::var(format!("{}_HISTORY_LIMIT", ENV_PREFIX)) {
            self.history_limit = if val.is_empty() {
                None
            } else {
                Some(val.parse().with_context(|| {
                    format!("Invalid {}_HISTORY_LIMIT: {:?}", ENV_PREFIX, val)
                })?)
            };
        }

        Ok(())
    }

    /// Ensure data directory exists
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with POSTLIST_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("postlist")
            .join("config.toml")
    }

    /// Get the path to the persisted session fragment
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("postlist")
}

fn default_timeout_secs() -> u64 {
    30
}
