//! Transform capability and the declarative transform chain.
//!
//! A derivative is produced by running its chain left-to-right over the
//! original image. Each step is a [`Transform`]: it borrows the previous image
//! and returns a new one. New kinds of step (watermarks, colour grading, ...)
//! only need to implement the trait; the orchestrator never inspects them.
//!
//! [`TransformConfig`] is the serializable form used in TOML collection
//! definitions.

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::thumbnail::ThumbnailSpec;

/// A pure image-to-image step.
pub trait Transform: Send + Sync {
    /// Short name for logging (e.g., "thumbnail").
    fn name(&self) -> &str;

    /// Produce a new image from `image`. Must not mutate shared state.
    fn apply(&self, image: &DynamicImage) -> DynamicImage;
}

/// Declarative transform, as written in configuration.
///
/// ```toml
/// transforms = [
///     { type = "thumbnail", width = 120, height = 80 },
///     { type = "grayscale" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransformConfig {
    /// Centre crop + resize, see [`ThumbnailSpec`]
    Thumbnail(ThumbnailSpec),
    /// Convert to luma
    Grayscale,
}

impl TransformConfig {
    /// Materialize into a shareable transform.
    pub fn build(&self) -> Arc<dyn Transform> {
        match self {
            TransformConfig::Thumbnail(spec) => Arc::new(*spec),
            TransformConfig::Grayscale => Arc::new(Grayscale),
        }
    }
}

/// Luma conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grayscale;

impl Transform for Grayscale {
    fn name(&self) -> &str {
        "grayscale"
    }

    fn apply(&self, image: &DynamicImage) -> DynamicImage {
        image.grayscale()
    }
}

/// Run `chain` first-to-last over `image`. An empty chain yields a copy.
pub fn apply_chain(image: &DynamicImage, chain: &[Arc<dyn Transform>]) -> DynamicImage {
    let mut steps = chain.iter();
    let Some(first) = steps.next() else {
        return image.clone();
    };
    steps.fold(first.apply(image), |current, step| step.apply(&current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use std::sync::Mutex;

    /// Records the size of every image it sees.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl Transform for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn apply(&self, image: &DynamicImage) -> DynamicImage {
            self.seen.lock().unwrap().push(image.dimensions());
            image.clone()
        }
    }

    #[test]
    fn test_empty_chain_copies_input() {
        let img = DynamicImage::new_rgb8(12, 7);
        let out = apply_chain(&img, &[]);
        assert_eq!(out, img);
    }

    #[test]
    fn test_chain_runs_left_to_right() {
        let recorder = Arc::new(Recorder::default());
        let chain: Vec<Arc<dyn Transform>> = vec![
            TransformConfig::Thumbnail(ThumbnailSpec::fill(40, 20).unwrap()).build(),
            recorder.clone() as Arc<dyn Transform>,
            TransformConfig::Thumbnail(ThumbnailSpec::fill(10, 10).unwrap()).build(),
        ];
        let out = apply_chain(&DynamicImage::new_rgb8(400, 400), &chain);

        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(*recorder.seen.lock().unwrap(), vec![(40, 20)]);
    }

    #[test]
    fn test_grayscale_transform() {
        let out = Grayscale.apply(&DynamicImage::new_rgb8(4, 4));
        assert_eq!(out.color(), image::ColorType::L8);
    }

    #[test]
    fn test_transform_config_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            transforms: Vec<TransformConfig>,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            transforms = [
                { type = "thumbnail", width = 120, height = 80 },
                { type = "grayscale" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(
            parsed.transforms,
            vec![
                TransformConfig::Thumbnail(ThumbnailSpec::fill(120, 80).unwrap()),
                TransformConfig::Grayscale,
            ]
        );
        assert_eq!(parsed.transforms[0].build().name(), "thumbnail");
    }

    #[test]
    fn test_transform_config_rejects_invalid_thumbnail() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrapper {
            transforms: Vec<TransformConfig>,
        }

        let parsed = toml::from_str::<Wrapper>(r#"transforms = [{ type = "thumbnail" }]"#);
        assert!(parsed.is_err());
    }
}
