//! Collection definitions: key layout, output format, derivative specs, and
//! the content-hash blacklist.
//!
//! A [`CollectionConfig`] is built once (typically per media type, e.g.
//! avatars vs. photos) and then shared read-only by every process call.
//! All validation happens in [`CollectionConfigBuilder::build`], so a bad
//! spec fails at startup rather than halfway through an upload.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;

use super::encode::{EncodeOptions, OutputFormat};
use super::hash::ContentHash;
use super::thumbnail::ThumbnailSpec;
use super::transform::{Transform, TransformConfig};

/// A named transform chain stored under `base_key + key_suffix`.
#[derive(Clone)]
pub struct DerivativeSpec {
    key_suffix: String,
    transforms: Vec<Arc<dyn Transform>>,
    encoding: EncodeOptions,
}

impl DerivativeSpec {
    /// Build a spec from arbitrary transforms.
    pub fn new(key_suffix: impl Into<String>, transforms: Vec<Arc<dyn Transform>>) -> Self {
        Self {
            key_suffix: key_suffix.into(),
            transforms,
            encoding: EncodeOptions::default(),
        }
    }

    /// Build a spec from declarative transform configs.
    pub fn from_configs(key_suffix: impl Into<String>, configs: &[TransformConfig]) -> Self {
        Self::new(key_suffix, configs.iter().map(TransformConfig::build).collect())
    }

    /// Single-thumbnail derivative, the common case.
    pub fn thumbnail(key_suffix: impl Into<String>, spec: ThumbnailSpec) -> Self {
        let transform: Arc<dyn Transform> = Arc::new(spec);
        Self::new(key_suffix, vec![transform])
    }

    pub fn key_suffix(&self) -> &str {
        &self.key_suffix
    }

    pub fn transforms(&self) -> &[Arc<dyn Transform>] {
        &self.transforms
    }

    /// Encoding overrides for this derivative only. Unset fields fall back
    /// to the collection's encoding.
    pub fn with_encoding(mut self, encoding: EncodeOptions) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn encoding(&self) -> &EncodeOptions {
        &self.encoding
    }
}

impl fmt::Debug for DerivativeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.transforms.iter().map(|t| t.name()).collect();
        f.debug_struct("DerivativeSpec")
            .field("key_suffix", &self.key_suffix)
            .field("transforms", &names)
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Validated, immutable settings for one collection of images.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    key_prefix: String,
    format: OutputFormat,
    encoding: EncodeOptions,
    derivatives: Vec<DerivativeSpec>,
    blacklist: BTreeSet<ContentHash>,
    default_image: Option<String>,
}

impl CollectionConfig {
    /// Encoding for `spec`: its overrides layered over the collection's.
    pub fn encoding_for(&self, spec: &DerivativeSpec) -> EncodeOptions {
        spec.encoding.merged_over(&self.encoding)
    }

    /// Start building a collection rooted at `key_prefix` (e.g. `"users/"`).
    pub fn builder(key_prefix: impl Into<String>) -> CollectionConfigBuilder {
        CollectionConfigBuilder {
            key_prefix: key_prefix.into(),
            format: OutputFormat::default(),
            encoding: EncodeOptions::default(),
            derivatives: Vec::new(),
            blacklist: Vec::new(),
            default_image: None,
        }
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn encoding(&self) -> &EncodeOptions {
        &self.encoding
    }

    pub fn derivatives(&self) -> &[DerivativeSpec] {
        &self.derivatives
    }

    pub fn blacklist(&self) -> &BTreeSet<ContentHash> {
        &self.blacklist
    }

    pub fn default_image(&self) -> Option<&str> {
        self.default_image.as_deref()
    }

    pub fn is_blacklisted(&self, hash: &ContentHash) -> bool {
        self.blacklist.contains(hash)
    }
}

/// Builder for [`CollectionConfig`].
#[derive(Debug)]
pub struct CollectionConfigBuilder {
    key_prefix: String,
    format: OutputFormat,
    encoding: EncodeOptions,
    derivatives: Vec<DerivativeSpec>,
    blacklist: Vec<String>,
    default_image: Option<String>,
}

impl CollectionConfigBuilder {
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn encoding(mut self, encoding: EncodeOptions) -> Self {
        self.encoding = encoding;
        self
    }

    /// Append a derivative; derivatives are processed in insertion order.
    pub fn derivative(mut self, spec: DerivativeSpec) -> Self {
        self.derivatives.push(spec);
        self
    }

    pub fn derivatives(mut self, specs: impl IntoIterator<Item = DerivativeSpec>) -> Self {
        self.derivatives.extend(specs);
        self
    }

    /// Content hashes (hex) whose images are silently ignored.
    pub fn blacklist<I, S>(mut self, hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(hashes.into_iter().map(Into::into));
        self
    }

    /// Image id served by `get_url` when the caller has none.
    pub fn default_image(mut self, id: impl Into<String>) -> Self {
        self.default_image = Some(id.into());
        self
    }

    pub fn build(self) -> Result<CollectionConfig, ConfigError> {
        let mut suffixes = HashSet::new();
        for spec in &self.derivatives {
            if spec.key_suffix.is_empty() {
                return Err(ConfigError::InvalidSpec(
                    "derivative key_suffix must not be empty".into(),
                ));
            }
            if !suffixes.insert(spec.key_suffix.as_str()) {
                return Err(ConfigError::InvalidSpec(format!(
                    "duplicate derivative key_suffix '{}'",
                    spec.key_suffix
                )));
            }
        }

        let blacklist = self
            .blacklist
            .iter()
            .map(|entry| {
                ContentHash::parse(entry).ok_or_else(|| {
                    ConfigError::InvalidSpec(format!("blacklist entry '{entry}' is not a hex hash"))
                })
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        check_quality(&self.encoding, "encoding")?;
        for spec in &self.derivatives {
            check_quality(&spec.encoding, &format!("derivative '{}' encoding", spec.key_suffix))?;
        }

        Ok(CollectionConfig {
            key_prefix: self.key_prefix,
            format: self.format,
            encoding: self.encoding,
            derivatives: self.derivatives,
            blacklist,
            default_image: self.default_image,
        })
    }
}

fn check_quality(encoding: &EncodeOptions, what: &str) -> Result<(), ConfigError> {
    match encoding.quality {
        Some(quality) if quality == 0 || quality > 100 => Err(ConfigError::InvalidSpec(format!(
            "{what} quality must be between 1 and 100, got {quality}"
        ))),
        _ => Ok(()),
    }
}
