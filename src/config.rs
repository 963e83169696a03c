//! Application configuration
//!
//! Stored as JSON next to the other per-user files. Every field has a
//! default, so a partial (or missing) file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, LibraryError};
use crate::state::library::ProjectLibrary;
use crate::state::projects::RetryPolicy;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Catalog location; `None` uses the platform data directory
    pub database_path: Option<PathBuf>,

    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: String,

    /// Reconnect schedule for the project list subscription
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            log_filter: "info".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Default config file location:
    /// - Linux: ~/.config/brush-ai/config.json
    /// - macOS: ~/Library/Application Support/brush-ai/config.json
    /// - Windows: %APPDATA%\brush-ai\config.json
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("brush-ai");
        path.push("config.json");
        Some(path)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Convert to a pretty JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_json(&json)?)
    }

    /// Load `path`, or the defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_json()?).map_err(io_err)
    }

    /// Catalog path to open, resolving the platform default
    pub fn database_path(&self) -> Result<PathBuf, LibraryError> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => ProjectLibrary::default_path(),
        }
    }
}
