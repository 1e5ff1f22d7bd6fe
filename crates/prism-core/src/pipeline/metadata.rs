//! EXIF orientation handling.
//!
//! Only the orientation tag is read. Everything else in the EXIF block is
//! ignored, and the normalized image carries no EXIF data of its own.

use exif::{In, Reader, Tag};
use image::DynamicImage;
use std::io::Cursor;

/// Reads orientation metadata from encoded image bytes.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Read the EXIF orientation tag (1–8).
    ///
    /// Returns `None` if the bytes carry no EXIF block or no orientation tag.
    pub fn orientation(bytes: &[u8]) -> Option<u32> {
        let mut cursor = Cursor::new(bytes);
        let exif = Reader::new().read_from_container(&mut cursor).ok()?;
        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
    }
}

/// Physically apply an EXIF orientation so "up is up".
///
/// 1 and unknown values pass through unchanged.
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    /// 2x1 image: red on the left, blue on the right.
    fn marker() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        }))
    }

    fn red_at(img: &DynamicImage) -> (u32, u32) {
        let rgb = img.to_rgb8();
        let (x, y, _) = rgb
            .enumerate_pixels()
            .find(|(_, _, p)| p[0] == 255)
            .unwrap();
        (x, y)
    }

    #[test]
    fn test_orientation_absent_for_plain_png() {
        let mut bytes = Vec::new();
        marker()
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(MetadataExtractor::orientation(&bytes), None);
    }

    #[test]
    fn test_orientation_garbage_is_none() {
        assert_eq!(MetadataExtractor::orientation(b"not an image"), None);
    }

    #[test]
    fn test_identity_orientations() {
        for o in [0, 1, 9, 42] {
            let out = apply_orientation(marker(), o);
            assert_eq!(out.dimensions(), (2, 1));
            assert_eq!(red_at(&out), (0, 0));
        }
    }

    #[test]
    fn test_mirror_and_rotate_180() {
        assert_eq!(red_at(&apply_orientation(marker(), 2)), (1, 0));
        assert_eq!(red_at(&apply_orientation(marker(), 3)), (1, 0));
        assert_eq!(red_at(&apply_orientation(marker(), 4)), (0, 0));
    }

    #[test]
    fn test_quarter_turns_swap_dimensions() {
        for o in 5..=8 {
            assert_eq!(apply_orientation(marker(), o).dimensions(), (1, 2), "orientation {o}");
        }
        // Rotated 90 CW: left edge becomes the top
        assert_eq!(red_at(&apply_orientation(marker(), 6)), (0, 0));
        // Rotated 90 CCW: left edge becomes the bottom
        assert_eq!(red_at(&apply_orientation(marker(), 8)), (0, 1));
    }
}
