//! On-disk layout of a pyramid.
//!
//! For a pyramid named `art_abc123` under a base directory:
//!
//! ```text
//! {base}/
//! ├── art_abc123.dzi              # descriptor, written last
//! ├── .art_abc123.lock            # present only while a generator runs
//! └── art_abc123_files/
//!     ├── 0/0_0.jpg               # 1×1 level
//!     ├── ...
//!     └── 12/{col}_{row}.jpg      # full resolution
//! ```
//!
//! A pyramid counts as complete when the descriptor is a regular file and the
//! tile root is a directory. Whoever deletes a source image is expected to
//! call [`remove_pyramid`] too; the generator never garbage-collects.

use crate::imaging::TileFormat;
use std::io;
use std::path::{Path, PathBuf};

/// Pyramid name for a source file: its stem (`art_abc123.jpg` → `art_abc123`).
pub fn pyramid_name(source: &Path) -> Option<String> {
    source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Default base directory for a source's pyramid: `dzi/` beside the source.
pub fn default_output_dir(source: &Path) -> PathBuf {
    source
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("dzi")
}

/// Tile file name within a level directory: `{col}_{row}.{ext}`.
pub fn tile_file_name(col: u32, row: u32, format: TileFormat) -> String {
    format!("{}_{}.{}", col, row, format.extension())
}

/// URL path of a descriptor for viewers, e.g. `/uploads/dzi/art_abc123.dzi`.
pub fn viewer_path(prefix: &str, name: &str) -> String {
    format!("{}/{}.dzi", prefix.trim_end_matches('/'), name)
}

/// Every path belonging to one pyramid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyramidPaths {
    base: PathBuf,
    name: String,
}

impl PyramidPaths {
    pub fn new(base: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            name: name.into(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `{base}/{name}.dzi`
    pub fn descriptor(&self) -> PathBuf {
        self.base.join(format!("{}.dzi", self.name))
    }

    /// `{base}/{name}_files`
    pub fn tiles_dir(&self) -> PathBuf {
        self.base.join(format!("{}_files", self.name))
    }

    /// `{base}/{name}_files/{level}`
    pub fn level_dir(&self, level: u32) -> PathBuf {
        self.tiles_dir().join(level.to_string())
    }

    /// `{base}/{name}_files/{level}/{col}_{row}.{ext}`
    pub fn tile_path(&self, level: u32, col: u32, row: u32, format: TileFormat) -> PathBuf {
        self.level_dir(level).join(tile_file_name(col, row, format))
    }

    /// `{base}/.{name}.lock`
    pub fn lock_path(&self) -> PathBuf {
        self.base.join(format!(".{}.lock", self.name))
    }

    /// Descriptor exists as a file and the tile root as a directory.
    pub fn is_complete(&self) -> bool {
        self.descriptor().is_file() && self.tiles_dir().is_dir()
    }

    /// Count `(levels, tiles)` in an existing tile tree.
    ///
    /// Levels are the numeric subdirectories of the tile root; tiles are the
    /// regular files inside them. Anything else is ignored.
    pub fn count_existing(&self) -> (u32, u64) {
        let mut levels = 0;
        let mut tiles = 0;
        for entry in walkdir::WalkDir::new(self.tiles_dir())
            .min_depth(1)
            .max_depth(2)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.depth() == 1 && entry.file_type().is_dir() && is_level_name(entry.path()) {
                levels += 1;
            } else if entry.depth() == 2
                && entry.file_type().is_file()
                && entry.path().parent().is_some_and(is_level_name)
            {
                tiles += 1;
            }
        }
        (levels, tiles)
    }
}

fn is_level_name(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.parse::<u32>().is_ok())
}

/// What [`remove_pyramid`] deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removed {
    pub descriptor: bool,
    pub tiles_dir: bool,
}

/// Delete a pyramid's descriptor and tile tree. Missing parts are not errors.
pub fn remove_pyramid(paths: &PyramidPaths) -> io::Result<Removed> {
    let mut removed = Removed::default();

    let descriptor = paths.descriptor();
    if descriptor.is_file() {
        std::fs::remove_file(&descriptor)?;
        removed.descriptor = true;
    }

    let tiles = paths.tiles_dir();
    if tiles.is_dir() {
        std::fs::remove_dir_all(&tiles)?;
        removed.tiles_dir = true;
    }

    Ok(removed)
}
