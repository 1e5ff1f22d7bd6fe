//! Object store adapters.
//!
//! The pipeline only ever talks to an [`ObjectStore`]: four verbs addressed
//! by string keys inside one bucket. Public URLs are derived separately as
//! `bucket_url + key` and never go through the store.
//!
//! Adapters:
//! - [`MemoryStore`]: in-process map, optionally recording every call
//! - [`FileSystemStore`]: one file per key under a root directory
//! - [`HttpStore`]: plain PUT/GET/DELETE/HEAD against a bucket endpoint

pub mod filesystem;
pub mod http;
pub mod memory;
pub mod provider;

pub use filesystem::FileSystemStore;
pub use http::HttpStore;
pub use memory::{MemoryStore, StoreCall};
pub use provider::{resolve_env_var, StoreFactory};

use async_trait::async_trait;

use crate::error::StoreResult;

/// Trait that all object store adapters implement.
///
/// Uses `async_trait` so the pipeline can hold an `Arc<dyn ObjectStore>`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Adapter name for logging (e.g., "memory", "http").
    fn name(&self) -> &str;

    /// Write `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()>;

    /// Read the object under `key`; `None` if absent.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Remove the object under `key`. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Whether an object exists under `key`.
    async fn exists(&self, key: &str) -> StoreResult<bool>;
}
