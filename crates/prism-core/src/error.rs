//! Error types for the Prism derivative pipeline.
//!
//! Errors are organized by layer: configuration problems surface when a
//! collection is built, pipeline errors when an image is loaded or encoded,
//! and store errors when the object store rejects an operation.
//!
//! Blacklist hits and "derivative already exists" skips are not errors; they
//! are reported through [`ProcessOutcome`](crate::types::ProcessOutcome) and
//! [`DerivativeOutcome`](crate::types::DerivativeOutcome).

use thiserror::Error;

/// Top-level error type for Prism operations.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image loading, transform, and encoding errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Object store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A thumbnail or derivative spec is malformed
    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// Classify a TOML error. Specs rejected while deserializing surface as
    /// [`ConfigError::InvalidSpec`]; everything else stays a parse error.
    pub fn from_toml(err: toml::de::Error) -> Self {
        // Matches the `InvalidSpec` display prefix above
        match err.message().strip_prefix("Invalid spec: ") {
            Some(reason) => ConfigError::InvalidSpec(reason.to_string()),
            None => ConfigError::ParseError(err),
        }
    }
}

/// Pipeline errors, organized by stage.
///
/// `origin` names where the image came from: a file path, a URL, or
/// `<memory>` for in-memory buffers.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image bytes could not be decoded
    #[error("Decode error for {origin}: {message}")]
    Decode { origin: String, message: String },

    /// Image is not JPEG or PNG
    #[error("Unsupported format for {origin}: {format}")]
    UnsupportedFormat { origin: String, format: String },

    /// Input exceeds the configured byte limit
    #[error("File too large: {origin} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        origin: String,
        size_mb: u64,
        max_mb: u64,
    },

    /// Decoded image exceeds the configured dimension limit
    #[error("Image too large: {origin} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        origin: String,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Network or file read failure
    #[error("Fetch failed for {origin}: {message}")]
    Fetch { origin: String, message: String },

    /// Encoding to JPEG/PNG failed
    #[error("Encode error: {message}")]
    Encode { message: String },

    /// Original image is missing from the store
    #[error("Image not found: {key}")]
    NotFound { key: String },
}

/// Object store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend rejected or failed an operation on a key
    #[error("{store} store failed on {key}: {message}")]
    Backend {
        store: String,
        key: String,
        message: String,
    },

    /// Local filesystem errors from the filesystem adapter
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store could not be constructed from its configuration
    #[error("Store configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Prism results.
pub type Result<T> = std::result::Result<T, PrismError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Convenience type alias for object store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_converts_to_prism_error() {
        let err: PrismError = PipelineError::NotFound {
            key: "users/abc".into(),
        }
        .into();
        assert!(matches!(err, PrismError::Pipeline(PipelineError::NotFound { .. })));
        assert!(err.to_string().contains("users/abc"));
    }

    #[test]
    fn test_store_error_message_names_store_and_key() {
        let err = StoreError::Backend {
            store: "http".into(),
            key: "users/abc(20x10)".into(),
            message: "HTTP 503".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("http"));
        assert!(msg.contains("users/abc(20x10)"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_invalid_spec_message() {
        let err = ConfigError::InvalidSpec("width or height must be set".into());
        assert_eq!(err.to_string(), "Invalid spec: width or height must be set");
    }
}
