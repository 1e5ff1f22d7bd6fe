//! Store construction from configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;

use super::{FileSystemStore, HttpStore, MemoryStore, ObjectStore};

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the configured store adapter.
pub struct StoreFactory;

impl StoreFactory {
    /// Build the adapter named by `config.backend`.
    ///
    /// Connections are set up here, once; the returned handle is shared by
    /// every collection that uses it.
    pub fn create(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
        match config.backend {
            StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreBackend::Filesystem => {
                let root = config.resolved_root().ok_or_else(|| {
                    StoreError::Config("filesystem backend requires store.root".into())
                })?;
                Ok(Arc::new(FileSystemStore::new(root)?))
            }
            StoreBackend::Http => {
                let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                    StoreError::Config("http backend requires store.endpoint".into())
                })?;
                let token = resolve_env_var(&config.auth_token);
                if token.is_none() && !config.auth_token.is_empty() {
                    tracing::warn!(
                        "store.auth_token '{}' did not resolve; sending unauthenticated requests",
                        config.auth_token
                    );
                }
                Ok(Arc::new(HttpStore::new(
                    endpoint,
                    token,
                    Duration::from_millis(config.timeout_ms),
                )?))
            }
        }
    }
}
