//! # DZI Pyramid
//!
//! Turns one large raster image into a Deep Zoom Image (DZI) tile pyramid: a
//! stack of progressively halved resolutions, each cut into fixed-size
//! overlapping tiles, plus the small XML descriptor a viewer such as
//! OpenSeadragon fetches first.
//!
//! # Architecture: Plan, Render, Slice, Commit
//!
//! ```text
//! 1. Validate   source     →  Dimensions        (header only, orientation aware)
//! 2. Plan       Dimensions →  levels 0..=max    (pure math)
//! 3. Render     source     →  level raster      (Lanczos3, one level at a time)
//! 4. Slice      raster     →  {col}_{row}.jpg   (overlapping tiles, row-major)
//! 5. Commit     counts     →  {name}.dzi        (atomic write; the pyramid now exists)
//! ```
//!
//! Everything geometric lives in pure functions so unit tests can check tile
//! boundaries without decoding a single pixel. Pixel work goes through the
//! [`imaging::ImageBackend`] trait so the orchestrator can be tested against
//! a recording mock.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pyramid`] | Orchestrator: validation, idempotency, locking, rollback, batch runs |
//! | [`imaging`] | Level/tile math, the backend trait, and the pure-Rust backend |
//! | [`descriptor`] | DZI XML serialization and its atomic write |
//! | [`layout`] | On-disk naming: descriptor, tile tree, lock file, removal |
//! | [`config`] | `dzi.toml` loading, layering over stock defaults, validation |
//! | [`output`] | CLI output formatting for generate, plan, and remove |
//!
//! # Design Decisions
//!
//! ## The Descriptor Is the Commit Point
//!
//! A viewer that finds `{name}.dzi` assumes every tile it names exists. The
//! descriptor is therefore written last, through a temp file and a rename, and
//! any failure before that removes the whole tile tree. Readers see either no
//! pyramid or a complete one.
//!
//! ## Every Level From the Source
//!
//! Each level is resampled directly from the full-resolution source instead of
//! from the level above it. Chained halving compounds filter error; resampling
//! from the source keeps small levels sharp at the cost of more work per level.
//!
//! ## Clip, Never Pad
//!
//! Tiles on the right and bottom edges are as large as the image allows and no
//! larger. Viewers compute tile extents from the descriptor and expect exactly
//! those bytes.
//!
//! ## Orientation Applied Once
//!
//! EXIF orientation is folded into the pixels at decode time and the descriptor
//! records the oriented dimensions, so tiles never carry rotation metadata.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling, and encoding use the `image` crate only. No ImageMagick,
//! no libvips: the binary has no system library dependencies.

pub mod config;
pub mod descriptor;
pub mod imaging;
pub mod layout;
pub mod output;
pub mod pyramid;

#[cfg(test)]
pub(crate) mod test_helpers;
