//! Image loading from memory, local files and URLs.
//!
//! Every source funnels into the same path: validate the encoded bytes,
//! decode on the blocking pool, normalize EXIF orientation, then check the
//! decoded dimensions against the configured limits.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;

use crate::config::{Config, LimitsConfig, LoaderConfig};
use crate::error::{PipelineError, PipelineResult};

use super::encode::OutputFormat;
use super::metadata::{apply_orientation, MetadataExtractor};
use super::validate::Validator;

/// Origin label used in errors for in-memory buffers.
pub const MEMORY_ORIGIN: &str = "<memory>";

/// Decodes images with configurable limits and orientation handling.
pub struct ImageLoader {
    validator: Validator,
    options: LoaderConfig,
    client: reqwest::Client,
}

/// Result of loading an image.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded (and possibly re-oriented) image
    pub image: DynamicImage,
    /// Source encoding
    pub format: OutputFormat,
    /// Width in pixels, after orientation
    pub width: u32,
    /// Height in pixels, after orientation
    pub height: u32,
    /// EXIF orientation tag as read from the source, if any
    pub orientation: Option<u32>,
    /// Size of the encoded input in bytes
    pub byte_size: u64,
}

impl ImageLoader {
    /// Create a new loader with the given limits and options.
    pub fn new(limits: LimitsConfig, options: LoaderConfig) -> Self {
        Self {
            validator: Validator::new(limits),
            options,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.limits.clone(), config.loader.clone())
    }

    /// Decode an in-memory buffer.
    pub async fn load_bytes(&self, bytes: Vec<u8>) -> PipelineResult<DecodedImage> {
        self.decode(bytes, MEMORY_ORIGIN.to_string()).await
    }

    /// Read and decode a local file.
    pub async fn load_path(&self, path: &Path) -> PipelineResult<DecodedImage> {
        let origin = path.display().to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::Fetch {
                origin: origin.clone(),
                message: e.to_string(),
            })?;
        self.decode(bytes, origin).await
    }

    /// Fetch `url` with a single GET and decode the body.
    ///
    /// Transport errors and non-2xx responses are reported as
    /// [`PipelineError::Fetch`]; nothing is retried.
    pub async fn load_url(&self, url: &str) -> PipelineResult<DecodedImage> {
        let fetch_err = |message: String| PipelineError::Fetch {
            origin: url.to_string(),
            message,
        };

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| fetch_err(format!("failed to read body: {e}")))?;
        tracing::trace!("Fetched {} bytes from {}", bytes.len(), url);

        self.decode(bytes.to_vec(), url.to_string()).await
    }

    async fn decode(&self, bytes: Vec<u8>, origin: String) -> PipelineResult<DecodedImage> {
        let format = self.validator.validate_bytes(&bytes, &origin)?;
        let normalize = self.options.normalize_orientation;

        let task_origin = origin.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            Self::decode_sync(bytes, format, normalize, &task_origin)
        })
        .await
        .map_err(|e| PipelineError::Decode {
            origin: origin.clone(),
            message: format!("Task join error: {e}"),
        })??;

        let max_dim = self.validator.limits().max_image_dimension;
        if decoded.width > max_dim || decoded.height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                origin,
                width: decoded.width,
                height: decoded.height,
                max_dim,
            });
        }
        Ok(decoded)
    }

    /// Synchronous decode (runs in spawn_blocking).
    fn decode_sync(
        bytes: Vec<u8>,
        format: ImageFormat,
        normalize: bool,
        origin: &str,
    ) -> PipelineResult<DecodedImage> {
        let output_format =
            OutputFormat::from_image_format(format).ok_or_else(|| {
                PipelineError::UnsupportedFormat {
                    origin: origin.to_string(),
                    format: format!("{format:?}"),
                }
            })?;

        let orientation = MetadataExtractor::orientation(&bytes);
        let image = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
            PipelineError::Decode {
                origin: origin.to_string(),
                message: e.to_string(),
            }
        })?;

        let image = match orientation {
            Some(o) if normalize => apply_orientation(image, o),
            _ => image,
        };

        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            format: output_format,
            width,
            height,
            orientation,
            byte_size: bytes.len() as u64,
        })
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new(LimitsConfig::default(), LoaderConfig::default())
    }
}
