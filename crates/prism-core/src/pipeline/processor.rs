//! Derivative orchestration: keeps a collection's stored objects in sync
//! with its derivative specs.
//!
//! ```text
//! image → validate size → hash → blacklist? → store original → derivatives
//! ```
//!
//! Every key is derived from the content hash, so processing the same image
//! twice finds everything already present and writes nothing.

use image::{DynamicImage, GenericImageView};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{PipelineError, Result};
use crate::types::{DerivativeOutcome, DerivativeReport, OriginalOutcome, ProcessOutcome};
use crate::Prism;

use super::collection::{CollectionConfig, DerivativeSpec};
use super::decode::DecodedImage;
use super::hash::Hasher;
use super::transform::apply_chain;

/// Options for a single `process` call.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Store the original image alongside its derivatives
    pub save_original: bool,
    /// Regenerate and overwrite keys that already exist
    pub force: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            save_original: true,
            force: false,
        }
    }
}

/// Manages one collection of images in the store.
///
/// Cheap to clone; holds no mutable state, so independent `process` calls
/// may run concurrently.
#[derive(Clone)]
pub struct CollectionManager {
    prism: Prism,
    config: Arc<CollectionConfig>,
}

impl CollectionManager {
    pub fn new(prism: Prism, config: Arc<CollectionConfig>) -> Self {
        Self { prism, config }
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Storage key of the original with id `id`.
    pub fn id_to_key(&self, id: &str) -> String {
        format!("{}{}", self.config.key_prefix(), id)
    }

    /// Storage key of `spec`'s derivative of the object at `base_key`.
    pub fn derivative_key(&self, base_key: &str, spec: &DerivativeSpec) -> String {
        format!("{}{}", base_key, spec.key_suffix())
    }

    /// Hash, store and derive one image.
    pub async fn process(
        &self,
        image: &DynamicImage,
        options: &ProcessOptions,
    ) -> Result<ProcessOutcome> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            tracing::error!("Refusing to process invalid image ({}x{})", width, height);
            return Ok(ProcessOutcome::Invalid);
        }

        let hash_start = Instant::now();
        let hash = Hasher::content_hash(image);
        tracing::trace!("  Content hash: {:?}", hash_start.elapsed());

        if self.config.is_blacklisted(&hash) {
            tracing::info!("Ignoring blacklisted image {}", hash);
            return Ok(ProcessOutcome::Blacklisted { hash });
        }

        let key = self.id_to_key(hash.as_str());
        let original = if !options.save_original {
            OriginalOutcome::Suppressed
        } else if !options.force && self.prism.store().exists(&key).await? {
            tracing::debug!("Original already stored: {}", key);
            OriginalOutcome::AlreadyPresent
        } else {
            self.save_image(image, hash.as_str()).await?;
            OriginalOutcome::Stored
        };

        let derivatives = self
            .process_derivatives(image, hash.as_str(), options.force)
            .await?;

        let generated = derivatives
            .iter()
            .filter(|d| d.outcome == DerivativeOutcome::Generated)
            .count();
        tracing::info!(
            "Processed {} ({}x{}): {} derivatives generated, {} skipped in {:?}",
            hash,
            width,
            height,
            generated,
            derivatives.len() - generated,
            start.elapsed()
        );

        Ok(ProcessOutcome::Stored {
            hash,
            key,
            original,
            derivatives,
        })
    }

    /// Decode an in-memory buffer and process it.
    pub async fn process_bytes(
        &self,
        bytes: Vec<u8>,
        options: &ProcessOptions,
    ) -> Result<ProcessOutcome> {
        let decoded = self.prism.loader().load_bytes(bytes).await?;
        self.process(&decoded.image, options).await
    }

    /// Read, decode and process a local file.
    pub async fn process_path(&self, path: &Path, options: &ProcessOptions) -> Result<ProcessOutcome> {
        tracing::debug!("Processing: {:?}", path);
        let decoded = self.prism.loader().load_path(path).await?;
        self.process(&decoded.image, options).await
    }

    /// Fetch, decode and process a remote image.
    pub async fn process_url(&self, url: &str, options: &ProcessOptions) -> Result<ProcessOutcome> {
        tracing::debug!("Processing: {}", url);
        let decoded = self.prism.loader().load_url(url).await?;
        self.process(&decoded.image, options).await
    }

    /// Encode `image` in the collection format and store it as `id`.
    ///
    /// Returns the storage key.
    pub async fn save_image(&self, image: &DynamicImage, id: &str) -> Result<String> {
        let key = self.id_to_key(id);
        self.prism
            .save_image(&key, image, self.config.format(), self.config.encoding())
            .await?;
        Ok(key)
    }

    /// Run every derivative spec against `image`, stored under `id`.
    ///
    /// Specs run in declaration order. A failure stops the loop; derivatives
    /// stored before it stay in place.
    pub async fn process_derivatives(
        &self,
        image: &DynamicImage,
        id: &str,
        force: bool,
    ) -> Result<Vec<DerivativeReport>> {
        let base_key = self.id_to_key(id);
        let mut reports = Vec::with_capacity(self.config.derivatives().len());
        for spec in self.config.derivatives() {
            let outcome = self.ensure_derivative(&base_key, image, spec, force).await?;
            reports.push(DerivativeReport {
                key: self.derivative_key(&base_key, spec),
                outcome,
            });
        }
        Ok(reports)
    }

    /// Make sure the derivative of `image` described by `spec` is stored.
    ///
    /// Existence is checked first unless `force` is set. The check and the
    /// write are separate store calls, so two concurrent callers may both
    /// regenerate the same key; the result is identical either way.
    pub async fn ensure_derivative(
        &self,
        base_key: &str,
        image: &DynamicImage,
        spec: &DerivativeSpec,
        force: bool,
    ) -> Result<DerivativeOutcome> {
        let key = self.derivative_key(base_key, spec);
        if !force && self.prism.store().exists(&key).await? {
            tracing::debug!("Derivative already stored: {}", key);
            return Ok(DerivativeOutcome::Skipped);
        }

        let transform_start = Instant::now();
        let derived = apply_chain(image, spec.transforms());
        tracing::trace!("  Transform {:?}: {:?}", spec, transform_start.elapsed());

        let encoding = self.config.encoding_for(spec);
        self.prism
            .save_image(&key, &derived, self.config.format(), &encoding)
            .await?;
        Ok(DerivativeOutcome::Generated)
    }

    /// Reload the stored original for `id` and re-run every derivative spec.
    ///
    /// Used after specs change. A missing original is logged and reported as
    /// [`PipelineError::NotFound`].
    pub async fn reprocess_derivatives(
        &self,
        id: &str,
        force: bool,
    ) -> Result<Vec<DerivativeReport>> {
        let key = self.id_to_key(id);
        let Some(bytes) = self.prism.store().get(&key).await? else {
            tracing::warn!("Cannot reprocess {}: original not found", key);
            return Err(PipelineError::NotFound { key }.into());
        };

        let decoded = self.prism.loader().load_bytes(bytes).await?;
        self.process_derivatives(&decoded.image, id, force).await
    }

    /// Delete the original for `id` and every derivative key.
    ///
    /// Every key is attempted even if an earlier delete fails; the first
    /// failure is returned afterwards. Returns the number of keys deleted.
    pub async fn delete(&self, id: &str) -> Result<usize> {
        let base_key = self.id_to_key(id);
        let keys = std::iter::once(base_key.clone()).chain(
            self.config
                .derivatives()
                .iter()
                .map(|spec| self.derivative_key(&base_key, spec)),
        );

        let mut deleted = 0;
        let mut first_error = None;
        for key in keys {
            match self.prism.store().delete(&key).await {
                Ok(()) => {
                    tracing::debug!("Deleted {}", key);
                    deleted += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to delete {}: {}", key, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(deleted),
        }
    }

    /// Public URL of image `id`, falling back to the collection's default
    /// image. `None` when neither is available.
    pub fn get_url(&self, id: Option<&str>) -> Option<String> {
        id.filter(|id| !id.is_empty())
            .or(self.config.default_image())
            .map(|id| self.prism.url_for(&self.id_to_key(id)))
    }

    /// Download and decode the stored original of `id` through its public URL.
    pub async fn get_image(&self, id: &str) -> Result<DecodedImage> {
        let url = self.prism.url_for(&self.id_to_key(id));
        Ok(self.prism.loader().load_url(&url).await?)
    }
}
