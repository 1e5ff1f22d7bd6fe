//! Image derivative pipeline components.
//!
//! - **validate**: Size and magic-byte checks before decoding
//! - **decode**: Load images from memory, files and URLs
//! - **metadata**: EXIF orientation handling
//! - **thumbnail**: Centre-crop-and-resize geometry
//! - **transform**: The `Transform` trait and declarative chains
//! - **encode**: JPEG/PNG encoding
//! - **hash**: Content hashes over decoded pixels
//! - **collection**: Per-collection key layout and derivative specs
//! - **processor**: Keeps stored derivatives in sync with their specs

pub mod collection;
pub mod decode;
pub mod encode;
pub mod hash;
pub mod metadata;
pub mod processor;
pub mod thumbnail;
pub mod transform;
pub mod validate;

// Re-exports for convenient access
pub use collection::{CollectionConfig, CollectionConfigBuilder, DerivativeSpec};
pub use decode::{DecodedImage, ImageLoader};
pub use encode::{EncodeOptions, Encoder, OutputFormat};
pub use hash::{ContentHash, Hasher};
pub use metadata::{apply_orientation, MetadataExtractor};
pub use processor::{CollectionManager, ProcessOptions};
pub use thumbnail::{thumbnail, CropRect, ThumbnailPlan, ThumbnailSpec};
pub use transform::{apply_chain, Grayscale, Transform, TransformConfig};
pub use validate::Validator;
