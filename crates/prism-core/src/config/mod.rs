//! Configuration management for Prism.
//!
//! Configuration is a TOML file with a `[store]` connection, resource
//! `[limits]`, `[loader]` options and any number of `[[collections]]`.
//! Every section implements `Default`, so an empty file is a valid
//! (memory-backed, collection-less) configuration.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::pipeline::CollectionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Prism.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Object store connection
    pub store: StoreConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Image loader settings
    pub loader: LoaderConfig,

    /// Named image collections
    pub collections: Vec<CollectionSection>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::from_toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.prism.prism/config.toml
    /// - Linux: ~/.config/prism/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\prism\config\config.toml
    ///
    /// Falls back to ~/.prism/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "prism", "prism")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".prism").join("config.toml")
            })
    }

    /// Look up a collection section by name.
    pub fn collection(&self, name: &str) -> Option<&CollectionSection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Build the validated [`CollectionConfig`] for a named collection.
    pub fn build_collection(&self, name: &str) -> Result<CollectionConfig, ConfigError> {
        self.collection(name)
            .ok_or_else(|| ConfigError::ValidationError(format!("unknown collection '{name}'")))?
            .build()
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
