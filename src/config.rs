//! Configuration management for MechanicBuddy
//!
//! TOML-based configuration with defaults and validation.
//! Location: ~/.mechanicbuddy/config.toml

use crate::errors::{DiagError, Result};
use crate::streaming::{DEFAULT_MODEL, DEFAULT_UPSTREAM_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration for MechanicBuddy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Upstream text-generation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Only the connect phase is bounded; generation may run as long as it needs
    pub connect_timeout_secs: u64,
}

/// Tabular record sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub issues_path: String,
    pub steps_path: String,
}

/// Transcript storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub storage_dir: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.2,
            connect_timeout_secs: 10,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            issues_path: "data/car_issues.csv".to_string(),
            steps_path: "data/step_by_step.csv".to_string(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            storage_dir: "~/.mechanicbuddy/history".to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Config {
    /// Load configuration from the given file, or from the standard location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(config_path) => Self::load_from(config_path),
            None => Self::load_default(),
        }
    }

    /// Load configuration from specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DiagError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| DiagError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from ~/.mechanicbuddy/config.toml, creating a default file if it doesn't exist
    pub fn load_default() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.upstream.url.trim().is_empty() {
            return Err(DiagError::Config("upstream.url must not be empty".to_string()));
        }

        if self.upstream.model.trim().is_empty() {
            return Err(DiagError::Config("upstream.model must not be empty".to_string()));
        }

        if self.upstream.max_tokens == 0 {
            return Err(DiagError::Config(
                "upstream.max_tokens must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.upstream.temperature) {
            return Err(DiagError::Config(
                "upstream.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.upstream.connect_timeout_secs == 0 {
            return Err(DiagError::Config(
                "upstream.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| DiagError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DiagError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| DiagError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DiagError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".mechanicbuddy").join("config.toml"))
    }

    /// Point both record sources at files inside `dir`
    pub fn set_data_dir(&mut self, dir: &Path) {
        self.data.issues_path = dir.join("car_issues.csv").to_string_lossy().into_owned();
        self.data.steps_path = dir.join("step_by_step.csv").to_string_lossy().into_owned();
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn issues_path(&self) -> PathBuf {
        Self::expand_path(&self.data.issues_path)
    }

    pub fn steps_path(&self) -> PathBuf {
        Self::expand_path(&self.data.steps_path)
    }

    pub fn history_dir(&self) -> PathBuf {
        Self::expand_path(&self.history.storage_dir)
    }
}
