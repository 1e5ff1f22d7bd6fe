//! Prism Core - image derivative pipeline.
//!
//! Prism takes source images, identifies them by a hash of their pixels,
//! and keeps an object store in sync with a declarative set of derivatives
//! (thumbnails and other transform chains) for each collection.
//!
//! # Architecture
//!
//! ```text
//! Image → Load → Hash → Blacklist? → Store original → Transform chains → Encode → Store
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use prism_core::{Config, Prism, ProcessOptions};
//!
//! #[tokio::main]
//! async fn main() -> prism_core::Result<()> {
//!     let config = Config::load()?;
//!     let prism = Prism::from_config(&config)?;
//!     let avatars = prism.collection_named(&config, "avatars")?;
//!
//!     let outcome = avatars
//!         .process_path("./me.jpg".as_ref(), &ProcessOptions::default())
//!         .await?;
//!     println!("Stored as {:?}", outcome.hash());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    ConfigError, PipelineError, PipelineResult, PrismError, Result, StoreError, StoreResult,
};
pub use pipeline::{
    CollectionConfig, CollectionManager, ContentHash, DerivativeSpec, EncodeOptions, ImageLoader,
    OutputFormat, ProcessOptions, ThumbnailSpec, Transform, TransformConfig,
};
pub use store::{ObjectStore, StoreFactory};
pub use types::{DerivativeOutcome, DerivativeReport, OriginalOutcome, ProcessOutcome, ProcessingStats};

use image::DynamicImage;
use std::sync::Arc;

use pipeline::Encoder;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prism connection - the main entry point.
///
/// Holds one object store handle, the bucket's public URL and an image
/// loader, and hands out a [`CollectionManager`] per collection. Clones share
/// the same store and loader.
#[derive(Clone)]
pub struct Prism {
    store: Arc<dyn ObjectStore>,
    bucket_url: String,
    loader: Arc<ImageLoader>,
}

impl Prism {
    /// Create a connection over an existing store with a default loader.
    pub fn new(store: Arc<dyn ObjectStore>, bucket_url: impl Into<String>) -> Self {
        Self {
            store,
            bucket_url: bucket_url.into(),
            loader: Arc::new(ImageLoader::default()),
        }
    }

    /// Build the store and loader described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        tracing::debug!("Initializing Prism v{}", VERSION);
        let store = StoreFactory::create(&config.store)?;
        tracing::debug!(
            "Using {} store, public URL prefix '{}'",
            store.name(),
            config.store.bucket_url
        );
        Ok(Self::new(store, config.store.bucket_url.clone())
            .with_loader(ImageLoader::from_config(config)))
    }

    /// Replace the image loader.
    pub fn with_loader(mut self, loader: ImageLoader) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    /// Manager for a collection.
    pub fn collection(&self, config: impl Into<Arc<CollectionConfig>>) -> CollectionManager {
        CollectionManager::new(self.clone(), config.into())
    }

    /// Manager for the collection named `name` in `config`.
    pub fn collection_named(&self, config: &Config, name: &str) -> Result<CollectionManager> {
        Ok(self.collection(config.build_collection(name)?))
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn bucket_url(&self) -> &str {
        &self.bucket_url
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    /// Public URL for `key`.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}{}", self.bucket_url, key)
    }

    /// Encode `image` and put it under `key`.
    pub async fn save_image(
        &self,
        key: &str,
        image: &DynamicImage,
        format: OutputFormat,
        options: &EncodeOptions,
    ) -> Result<()> {
        let encode_start = std::time::Instant::now();
        let bytes = Encoder::encode(image, format, options)?;
        tracing::trace!("  Encode {}: {:?}", format, encode_start.elapsed());

        let size = bytes.len();
        self.store.put(key, bytes, format.content_type()).await?;
        tracing::debug!("Stored {} ({} bytes, {})", key, size, format.content_type());
        Ok(())
    }

    /// Delete `key` from the store.
    pub async fn delete_image(&self, key: &str) -> Result<()> {
        self.store.delete(key).await?;
        tracing::debug!("Deleted {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_prism_from_default_config() {
        let prism = Prism::from_config(&Config::default()).unwrap();
        assert_eq!(prism.store().name(), "memory");
        assert_eq!(prism.bucket_url(), "");
    }

    #[test]
    fn test_collection_named() {
        let config = Config::from_toml_str(
            r#"
            [[collections]]
            name = "avatars"
            key_prefix = "users/"
            "#,
        )
        .unwrap();
        let prism = Prism::from_config(&config).unwrap();
        assert_eq!(
            prism.collection_named(&config, "avatars").unwrap().id_to_key("x"),
            "users/x"
        );
        assert!(prism.collection_named(&config, "photos").is_err());
    }

    #[tokio::test]
    async fn test_save_and_delete_image() {
        let store = Arc::new(MemoryStore::new());
        let prism = Prism::new(store.clone(), "https://cdn.example.com/");

        prism
            .save_image(
                "raw/one",
                &DynamicImage::new_rgb8(3, 3),
                OutputFormat::Png,
                &EncodeOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(store.content_type("raw/one").as_deref(), Some("image/png"));
        assert_eq!(prism.url_for("raw/one"), "https://cdn.example.com/raw/one");

        prism.delete_image("raw/one").await.unwrap();
        assert!(store.is_empty());
    }
}
