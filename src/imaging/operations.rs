//! High-level image operations: level rendering and tile slicing.
//!
//! These functions combine calculations with backend execution. They take
//! configuration, compute crop rectangles, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{PyramidLevel, tile_grid};
use super::params::EncodeParams;
use crate::layout::tile_file_name;
use image::DynamicImage;
use std::borrow::Cow;
use std::path::Path;
use thiserror::Error;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Failure to produce one tile, with its grid position.
#[derive(Error, Debug)]
#[error("tile {col}_{row}: {source}")]
pub struct TileError {
    pub col: u32,
    pub row: u32,
    pub source: BackendError,
}

/// Tile geometry and encoding shared by every level of a pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConfig {
    pub tile_size: u32,
    pub overlap: u32,
    pub encode: EncodeParams,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile_size: 256,
            overlap: 1,
            encode: EncodeParams::default(),
        }
    }
}

/// Produce the raster for `level` from the full-resolution `source`.
///
/// Every level is resampled directly from the source rather than from the
/// previous level, so resampling error never compounds. At full resolution
/// the source is returned as-is.
pub fn render_level<'a>(
    backend: &impl ImageBackend,
    source: &'a DynamicImage,
    level: &PyramidLevel,
) -> Result<Cow<'a, DynamicImage>> {
    if source.width() == level.width && source.height() == level.height {
        return Ok(Cow::Borrowed(source));
    }
    backend
        .resize(source, level.width, level.height)
        .map(Cow::Owned)
}

/// Cut `raster` into tiles and write each one into `level_dir`.
///
/// Tiles are cropped and encoded one at a time, so only a single tile buffer
/// is alive beside the level raster. Returns the number of tiles written.
pub fn slice_level(
    backend: &impl ImageBackend,
    raster: &DynamicImage,
    config: &TileConfig,
    level_dir: &Path,
) -> std::result::Result<u32, TileError> {
    let rects = tile_grid(
        raster.width(),
        raster.height(),
        config.tile_size,
        config.overlap,
    );

    for rect in &rects {
        let tile = raster.crop_imm(rect.x, rect.y, rect.width, rect.height);
        let output = level_dir.join(tile_file_name(rect.col, rect.row, config.encode.format));
        backend
            .encode_tile(&tile, &config.encode, &output)
            .map_err(|source| TileError {
                col: rect.col,
                row: rect.row,
                source,
            })?;
    }

    Ok(rects.len() as u32)
}
