//! JPEG/PNG encoding with per-key option overrides.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Storage encoding for originals and derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "JPEG", alias = "jpg")]
    Jpeg,
    #[serde(alias = "PNG")]
    Png,
}

impl OutputFormat {
    /// MIME type stored alongside the object.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
        }
    }

    /// Map a decoder format back to an output format, if supported.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Jpeg => write!(f, "jpeg"),
            OutputFormat::Png => write!(f, "png"),
        }
    }
}

/// Encoder knobs. Unset fields fall back to the defaults below.
///
/// - `quality`: JPEG quality 1–100, default 95. Ignored for PNG.
/// - `optimize`: spend more CPU for smaller files, default on. For PNG this
///   selects best compression with adaptive filtering; the JPEG encoder has
///   no equivalent switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize: Option<bool>,
}

impl EncodeOptions {
    pub const DEFAULT_JPEG_QUALITY: u8 = 95;

    /// Overlay `self` onto `base`, key by key.
    pub fn merged_over(&self, base: &EncodeOptions) -> EncodeOptions {
        EncodeOptions {
            quality: self.quality.or(base.quality),
            optimize: self.optimize.or(base.optimize),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
            .unwrap_or(Self::DEFAULT_JPEG_QUALITY)
            .clamp(1, 100)
    }

    pub fn optimize(&self) -> bool {
        self.optimize.unwrap_or(true)
    }
}

/// Serializes images for storage.
pub struct Encoder;

impl Encoder {
    /// Encode `image` as `format`.
    ///
    /// JPEG has no alpha channel, so the image is flattened to RGB first.
    /// PNG keeps the source colour type.
    pub fn encode(
        image: &DynamicImage,
        format: OutputFormat,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, PipelineError> {
        let mut buffer = Vec::new();
        let result = match format {
            OutputFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, options.quality());
                match image {
                    DynamicImage::ImageRgb8(_) => image.write_with_encoder(encoder),
                    _ => DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder),
                }
            }
            OutputFormat::Png => {
                let compression = if options.optimize() {
                    CompressionType::Best
                } else {
                    CompressionType::Default
                };
                let encoder =
                    PngEncoder::new_with_quality(&mut buffer, compression, PngFilter::Adaptive);
                image.write_with_encoder(encoder)
            }
        };

        result.map_err(|e| PipelineError::Encode {
            message: format!("{format}: {e}"),
        })?;
        Ok(buffer)
    }
}
