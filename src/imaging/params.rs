//! Parameter types for tile encoding.
//!
//! These structs describe *what* to write, not *how*. They sit between the
//! pyramid orchestrator (which decides tile names and encoding settings) and
//! the [`backend`](super::backend) (which does the pixel work), so a mock
//! backend can stand in during tests without changing the orchestration.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`TileFormat`] — Encoded tile format; its extension is also the DZI `Format` attribute.
//! - [`EncodeParams`] — Format + quality pair handed to the backend for every tile.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Encoded tile format.
///
/// Serialized as the file extension the viewer requests (`"jpg"`, `"png"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileFormat {
    #[default]
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
    #[serde(rename = "png")]
    Png,
}

impl TileFormat {
    /// File extension, without the dot. Doubles as the descriptor's `Format` value.
    pub fn extension(self) -> &'static str {
        match self {
            TileFormat::Jpeg => "jpg",
            TileFormat::Png => "png",
        }
    }

    /// Whether the `quality` setting has any effect for this format.
    pub fn is_lossy(self) -> bool {
        matches!(self, TileFormat::Jpeg)
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encoding settings applied to every tile of a pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeParams {
    pub format: TileFormat,
    pub quality: Quality,
}
