//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the pyramid
//! generator needs: identify, load, resize, and encode_tile.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests swap in the mock from this module's test submodule.

use super::params::EncodeParams;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation, after orientation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Implementations must be `Sync` so a batch can share one backend across
/// rayon workers.
pub trait ImageBackend: Sync {
    /// Read image dimensions from the header, as they will appear once the
    /// orientation tag is applied.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Fully decode the image with its orientation normalized into the pixels.
    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Resample `source` to exactly `width`×`height`.
    fn resize(
        &self,
        source: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, BackendError>;

    /// Encode one tile and write it to `output`.
    fn encode_tile(
        &self,
        tile: &DynamicImage,
        params: &EncodeParams,
        output: &Path,
    ) -> Result<(), BackendError>;
}
