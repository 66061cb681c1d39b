//! Image processing — pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | decoder header + EXIF orientation |
//! | **Load** | `image` decoders, orientation applied to pixels |
//! | **Render level** | Lanczos3 `resize_exact`, identity at full resolution |
//! | **Slice tiles** | `crop_imm` + JPEG/PNG encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for level and tile-grid math (unit testable)
//! - **Parameters**: Data structures describing tile encoding
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
pub mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{PyramidLevel, TileRect, plan_levels, tile_grid};
pub use operations::{TileConfig, TileError, render_level, slice_level};
pub use params::{EncodeParams, Quality, TileFormat};
pub use rust_backend::RustBackend;
