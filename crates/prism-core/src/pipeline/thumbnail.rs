//! Aspect-ratio-aware thumbnailing: centre crop to a target ratio, then resize.
//!
//! The geometry lives in [`ThumbnailSpec::plan`] so it can be tested without
//! touching pixels; [`thumbnail`] executes a plan against a `DynamicImage`.
//!
//! Crop bounds are half-open `(left, top, right, bottom)` rectangles. The
//! edge of the axis that is *not* being cropped is held at `dimension - 1`,
//! which drops the final row or column. Derivatives already sitting in
//! buckets were produced with that convention, so it is kept.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::transform::Transform;

/// Target geometry for a thumbnail.
///
/// At least one of `width` / `height` is always set. `max_ratio` bounds how
/// far the crop may reshape the image: the effective target ratio is clamped
/// into `[1 / max_ratio, max_ratio]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ThumbnailSpecRepr", into = "ThumbnailSpecRepr")]
pub struct ThumbnailSpec {
    width: Option<u32>,
    height: Option<u32>,
    max_ratio: Option<f64>,
}

/// Wire form of [`ThumbnailSpec`]; validated on the way in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ThumbnailSpecRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_ratio: Option<f64>,
}

impl TryFrom<ThumbnailSpecRepr> for ThumbnailSpec {
    type Error = ConfigError;

    fn try_from(repr: ThumbnailSpecRepr) -> Result<Self, Self::Error> {
        ThumbnailSpec::new(repr.width, repr.height, repr.max_ratio)
    }
}

impl From<ThumbnailSpec> for ThumbnailSpecRepr {
    fn from(spec: ThumbnailSpec) -> Self {
        Self {
            width: spec.width,
            height: spec.height,
            max_ratio: spec.max_ratio,
        }
    }
}

/// A crop rectangle in half-open pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Resolved geometry for one input size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailPlan {
    /// Ratio the crop aims for, after `max_ratio` clamping
    pub target_ratio: f64,
    /// Crop to apply before resizing, `None` when the ratio already matches
    pub crop: Option<CropRect>,
    /// Final output dimensions `(width, height)`
    pub output: (u32, u32),
}

impl ThumbnailSpec {
    /// Build a spec, rejecting geometry that can never produce an image.
    pub fn new(
        width: Option<u32>,
        height: Option<u32>,
        max_ratio: Option<f64>,
    ) -> Result<Self, ConfigError> {
        if width.is_none() && height.is_none() {
            return Err(ConfigError::InvalidSpec(
                "thumbnail width or height, or both, must be set".into(),
            ));
        }
        if width == Some(0) || height == Some(0) {
            return Err(ConfigError::InvalidSpec(
                "thumbnail width and height must be > 0".into(),
            ));
        }
        if let Some(ratio) = max_ratio {
            if !ratio.is_finite() || ratio < 1.0 {
                return Err(ConfigError::InvalidSpec(format!(
                    "thumbnail max_ratio must be >= 1.0, got {ratio}"
                )));
            }
        }
        Ok(Self {
            width,
            height,
            max_ratio,
        })
    }

    /// Fixed-size thumbnail: output is exactly `width x height`.
    pub fn fill(width: u32, height: u32) -> Result<Self, ConfigError> {
        Self::new(Some(width), Some(height), None)
    }

    /// Replace the ratio tolerance.
    pub fn with_max_ratio(self, max_ratio: f64) -> Result<Self, ConfigError> {
        Self::new(self.width, self.height, Some(max_ratio))
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn max_ratio(&self) -> Option<f64> {
        self.max_ratio
    }

    /// Ratio the crop should produce for an image of `current_ratio`.
    pub fn target_ratio(&self, current_ratio: f64) -> f64 {
        let ratio = match (self.width, self.height) {
            (Some(w), Some(h)) => w as f64 / h as f64,
            _ => current_ratio,
        };
        match self.max_ratio {
            Some(max) => ratio.clamp(1.0 / max, max),
            None => ratio,
        }
    }

    /// Compute crop and output geometry for a `width x height` input.
    pub fn plan(&self, width: u32, height: u32) -> ThumbnailPlan {
        let current_ratio = width as f64 / height as f64;
        let target_ratio = self.target_ratio(current_ratio);

        let crop = if current_ratio == target_ratio {
            None
        } else if current_ratio < target_ratio {
            // Taller than wanted: trim rows above and below
            let new_height = width as f64 / target_ratio;
            let (top, bottom) = centered_span(height, new_height);
            let (left, right) = held_edge(width);
            Some(CropRect {
                left,
                top,
                right,
                bottom,
            })
        } else {
            // Wider than wanted: trim columns left and right
            let new_width = height as f64 * target_ratio;
            let (left, right) = centered_span(width, new_width);
            let (top, bottom) = held_edge(height);
            Some(CropRect {
                left,
                top,
                right,
                bottom,
            })
        };

        let output = match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, ((w as f64 / target_ratio).floor() as u32).max(1)),
            (None, Some(h)) => (((h as f64 * target_ratio).floor() as u32).max(1), h),
            (None, None) => unreachable!("ThumbnailSpec::new rejects specs without dimensions"),
        };

        ThumbnailPlan {
            target_ratio,
            crop,
            output,
        }
    }
}

/// Bounds of a span of `new_len` centred on `len / 2`, truncated to integers.
///
/// The centre is fractional for odd lengths so the margins on either side
/// never differ by more than one pixel.
fn centered_span(len: u32, new_len: f64) -> (u32, u32) {
    let center = len as f64 / 2.0;
    let half = new_len / 2.0;
    let start = ((center - half) as i64).clamp(0, len as i64 - 1) as u32;
    let end = ((center + half) as i64).clamp(start as i64 + 1, len as i64) as u32;
    (start, end)
}

/// Bounds of the uncropped axis: `0 .. len - 1`, never empty.
fn held_edge(len: u32) -> (u32, u32) {
    (0, len.saturating_sub(1).max(1))
}

/// Crop and resize `image` according to `spec`. Never mutates the input.
pub fn thumbnail(image: &DynamicImage, spec: &ThumbnailSpec) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let plan = spec.plan(width, height);
    let (out_w, out_h) = plan.output;

    match plan.crop {
        Some(rect) => image
            .crop_imm(rect.left, rect.top, rect.width(), rect.height())
            .resize_exact(out_w, out_h, FilterType::Lanczos3),
        None => image.resize_exact(out_w, out_h, FilterType::Lanczos3),
    }
}

impl Transform for ThumbnailSpec {
    fn name(&self) -> &str {
        "thumbnail"
    }

    fn apply(&self, image: &DynamicImage) -> DynamicImage {
        thumbnail(image, self)
    }
}
