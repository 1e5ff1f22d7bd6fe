//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::pipeline::{
    CollectionConfig, DerivativeSpec, EncodeOptions, OutputFormat, TransformConfig,
};

/// Which [`ObjectStore`](crate::store::ObjectStore) adapter to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map; nothing survives the process
    #[default]
    Memory,
    /// Files under a local root directory
    Filesystem,
    /// Plain HTTP verbs against a bucket endpoint
    Http,
}

/// Object store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Adapter to use
    pub backend: StoreBackend,

    /// Public URL prefix; object URLs are `bucket_url + key`
    pub bucket_url: String,

    /// Root directory for the filesystem backend (`~` is expanded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Base URL for the HTTP backend; keys are appended verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Bearer token for the HTTP backend. Supports `${ENV_VAR}` syntax.
    pub auth_token: String,

    /// HTTP client timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            bucket_url: String::new(),
            root: None,
            endpoint: None,
            auth_token: String::new(),
            timeout_ms: 30000,
        }
    }
}

impl StoreConfig {
    /// Filesystem root with `~` expanded.
    pub fn resolved_root(&self) -> Option<PathBuf> {
        self.root
            .as_deref()
            .map(|root| PathBuf::from(shellexpand::tilde(root).into_owned()))
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum encoded input size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            max_image_dimension: 20000,
        }
    }
}

/// Image loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Physically rotate/flip images according to their EXIF orientation tag
    pub normalize_orientation: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            normalize_orientation: true,
        }
    }
}

/// One `[[collections]]` entry as written in TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSection {
    /// Lookup name, unique within a config
    pub name: String,

    /// Prepended to every storage key of this collection
    pub key_prefix: String,

    /// Storage encoding for originals and derivatives
    pub format: OutputFormat,

    /// Image id served by `get_url` when the caller has none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_image: Option<String>,

    /// Content hashes that are silently ignored
    pub blacklist: Vec<String>,

    /// Encoder options applied to every key in the collection
    pub encoding: EncodeOptions,

    /// Derivatives, generated in declaration order
    pub derivatives: Vec<DerivativeSection>,
}

/// One `[[collections.derivatives]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativeSection {
    /// Appended to the original's key
    pub key_suffix: String,

    /// Transform chain, applied left to right
    pub transforms: Vec<TransformConfig>,

    /// Overrides merged over the collection's `encoding`
    #[serde(skip_serializing_if = "is_unset")]
    pub encoding: EncodeOptions,
}

fn is_unset(encoding: &EncodeOptions) -> bool {
    *encoding == EncodeOptions::default()
}

impl CollectionSection {
    /// Validate and materialize into a [`CollectionConfig`].
    pub fn build(&self) -> Result<CollectionConfig, ConfigError> {
        let mut builder = CollectionConfig::builder(self.key_prefix.clone())
            .format(self.format)
            .encoding(self.encoding)
            .blacklist(self.blacklist.iter().cloned())
            .derivatives(
                self.derivatives
                    .iter()
                    .map(|d| {
                        DerivativeSpec::from_configs(d.key_suffix.clone(), &d.transforms)
                            .with_encoding(d.encoding)
                    }),
            );
        if let Some(default_image) = &self.default_image {
            builder = builder.default_image(default_image.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_defaults() {
        let store = StoreConfig::default();
        assert_eq!(store.backend, StoreBackend::Memory);
        assert_eq!(store.timeout_ms, 30000);
        assert!(store.resolved_root().is_none());
    }

    #[test]
    fn test_resolved_root_expands_tilde() {
        let store = StoreConfig {
            root: Some("~/bucket".into()),
            ..StoreConfig::default()
        };
        let root = store.resolved_root().unwrap();
        assert!(!root.to_string_lossy().starts_with('~'));
        assert!(root.ends_with("bucket"));
    }

    #[test]
    fn test_collection_section_build_rejects_duplicate_suffix() {
        let section = CollectionSection {
            name: "dup".into(),
            derivatives: vec![
                DerivativeSection {
                    key_suffix: "_s".into(),
                    transforms: vec![TransformConfig::Grayscale],
                    ..DerivativeSection::default()
                },
                DerivativeSection {
                    key_suffix: "_s".into(),
                    transforms: vec![],
                    ..DerivativeSection::default()
                },
            ],
            ..CollectionSection::default()
        };
        assert!(section.build().is_err());
    }
}
