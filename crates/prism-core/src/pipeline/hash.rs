//! Content hashing over decoded pixels.
//!
//! The hash identifies visual content, not a file: it is computed over the
//! raw pixel buffer of the decoded image, so the same picture saved as PNG
//! and as a re-encoded PNG with different compression collides to one key.

use std::fmt;

use blake3::Hasher as Blake3Hasher;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Lowercase hex BLAKE3 digest of an image's pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Parse a hex digest, normalizing to lowercase.
    ///
    /// Returns `None` for empty strings or non-hex characters.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes content hashes.
pub struct Hasher;

impl Hasher {
    /// Hash the decoded pixel buffer of `image`.
    pub fn content_hash(image: &DynamicImage) -> ContentHash {
        let mut hasher = Blake3Hasher::new();
        hasher.update(image.as_bytes());
        ContentHash(hasher.finalize().to_hex().to_string())
    }
}
