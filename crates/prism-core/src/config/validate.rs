//! Configuration validation with range and consistency checks.

use std::collections::HashSet;

use crate::error::ConfigError;

use super::{Config, StoreBackend};

impl Config {
    /// Validate configuration values and build every collection once.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }

        match self.store.backend {
            StoreBackend::Memory => {}
            StoreBackend::Filesystem => {
                if self.store.root.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::ValidationError(
                        "store.root is required for the filesystem backend".into(),
                    ));
                }
            }
            StoreBackend::Http => {
                if self.store.endpoint.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::ValidationError(
                        "store.endpoint is required for the http backend".into(),
                    ));
                }
                if self.store.timeout_ms == 0 {
                    return Err(ConfigError::ValidationError(
                        "store.timeout_ms must be > 0".into(),
                    ));
                }
            }
        }

        let mut names = HashSet::new();
        for section in &self.collections {
            if section.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "collections.name must not be empty".into(),
                ));
            }
            if !names.insert(section.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate collection name '{}'",
                    section.name
                )));
            }
            section.build().map_err(|e| {
                ConfigError::ValidationError(format!("collection '{}': {e}", section.name))
            })?;
        }
        Ok(())
    }
}
