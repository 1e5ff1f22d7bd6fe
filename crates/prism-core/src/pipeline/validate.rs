//! Input validation before decoding.
//!
//! The decoder is only ever handed JPEG or PNG bytes that fit the configured
//! size limit. Other well-known image signatures are recognized so that the
//! error names the actual format instead of a generic decode failure.

use image::ImageFormat;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates encoded image bytes before full decode.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Quick validation of an encoded buffer.
    ///
    /// Checks:
    /// - Byte size is within limits
    /// - Header carries a JPEG or PNG signature
    ///
    /// Returns the sniffed format.
    pub fn validate_bytes(&self, bytes: &[u8], origin: &str) -> Result<ImageFormat, PipelineError> {
        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        let size = bytes.len() as u64;
        if size > max_bytes {
            return Err(PipelineError::FileTooLarge {
                origin: origin.to_string(),
                size_mb: size / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        if bytes.len() < 4 {
            return Err(PipelineError::Decode {
                origin: origin.to_string(),
                message: "Input too small to be a valid image".to_string(),
            });
        }

        match Self::sniff(bytes) {
            Sniffed::Supported(format) => Ok(format),
            Sniffed::Other(name) => Err(PipelineError::UnsupportedFormat {
                origin: origin.to_string(),
                format: name.to_string(),
            }),
            Sniffed::Unknown => Err(PipelineError::Decode {
                origin: origin.to_string(),
                message: "Unrecognized image format (invalid magic bytes)".to_string(),
            }),
        }
    }

    /// Match the header against known image signatures.
    fn sniff(header: &[u8]) -> Sniffed {
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Sniffed::Supported(ImageFormat::Jpeg);
        }
        if header.starts_with(&[0x89, b'P', b'N', b'G']) {
            return Sniffed::Supported(ImageFormat::Png);
        }
        if header.starts_with(b"GIF8") {
            return Sniffed::Other("gif");
        }
        if header.starts_with(b"RIFF") && header.get(8..12) == Some(b"WEBP".as_slice()) {
            return Sniffed::Other("webp");
        }
        if header.starts_with(b"BM") {
            return Sniffed::Other("bmp");
        }
        // TIFF: II (little-endian) or MM (big-endian) followed by version 42
        if header.starts_with(&[b'I', b'I', 0x2A, 0x00])
            || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
        {
            return Sniffed::Other("tiff");
        }
        Sniffed::Unknown
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(LimitsConfig::default())
    }
}

#[derive(Debug, PartialEq)]
enum Sniffed {
    Supported(ImageFormat),
    Other(&'static str),
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_magic_bytes_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(Validator::sniff(&header), Sniffed::Supported(ImageFormat::Jpeg));
    }

    #[test]
    fn test_magic_bytes_png() {
        assert_eq!(Validator::sniff(&PNG_HEADER), Sniffed::Supported(ImageFormat::Png));
    }

    #[test]
    fn test_magic_bytes_webp_is_named() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert_eq!(Validator::sniff(&header), Sniffed::Other("webp"));
    }

    #[test]
    fn test_magic_bytes_tiff() {
        let le = [b'I', b'I', 0x2A, 0x00];
        let be = [b'M', b'M', 0x00, 0x2A];
        assert_eq!(Validator::sniff(&le), Sniffed::Other("tiff"));
        assert_eq!(Validator::sniff(&be), Sniffed::Other("tiff"));
        // Bare "II" without the version bytes is not TIFF
        assert_eq!(Validator::sniff(&[b'I', b'I', 0, 0]), Sniffed::Unknown);
    }

    #[test]
    fn test_validate_accepts_png() {
        let format = Validator::default()
            .validate_bytes(&PNG_HEADER, "<memory>")
            .unwrap();
        assert_eq!(format, ImageFormat::Png);
    }

    #[test]
    fn test_validate_rejects_gif_as_unsupported() {
        let err = Validator::default()
            .validate_bytes(b"GIF89a\x01\x00\x01\x00", "a.gif")
            .unwrap_err();
        match err {
            PipelineError::UnsupportedFormat { origin, format } => {
                assert_eq!(origin, "a.gif");
                assert_eq!(format, "gif");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let err = Validator::default()
            .validate_bytes(&[0u8; 16], "<memory>")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[test]
    fn test_validate_rejects_tiny_input() {
        let err = Validator::default()
            .validate_bytes(&[0xFF, 0xD8], "<memory>")
            .unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn test_validate_enforces_size_limit() {
        let validator = Validator::new(LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        });
        let mut bytes = PNG_HEADER.to_vec();
        bytes.resize(1024 * 1024 + 1, 0);
        let err = validator.validate_bytes(&bytes, "big.png").unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { max_mb: 1, .. }));
    }
}
