//! Generator configuration.
//!
//! Handles loading, validating, and layering a TOML config file over stock
//! defaults. The resulting [`Config`] is passed explicitly into the pyramid
//! generator; nothing is read from process-wide state.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [pyramid]
//! tile_size = 256     # Tile edge in pixels, excluding overlap
//! overlap = 1         # Border pixels shared with neighbouring tiles
//! format = "jpg"      # Tile format: "jpg" or "png"
//! quality = 85        # JPEG quality (1-100)
//!
//! [trigger]
//! min_dimension = 3000  # Only images with a longer edge >= this get a pyramid
//!
//! [processing]
//! max_processes = 4   # Max parallel images in a batch (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! [pyramid]
//! format = "png"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{EncodeParams, Quality, TileConfig, TileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Generator configuration loaded from a TOML file.
///
/// All fields have defaults matching the classic Deep Zoom setup (256px JPEG
/// tiles, 1px overlap). Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Tile geometry and encoding.
    pub pyramid: PyramidConfig,
    /// Which images callers should build pyramids for.
    pub trigger: TriggerConfig,
    /// Batch parallelism.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pyramid.tile_size == 0 {
            return Err(ConfigError::Validation(
                "pyramid.tile_size must be non-zero".into(),
            ));
        }
        if self.pyramid.overlap >= self.pyramid.tile_size {
            return Err(ConfigError::Validation(
                "pyramid.overlap must be smaller than pyramid.tile_size".into(),
            ));
        }
        if !(1..=100).contains(&self.pyramid.quality) {
            return Err(ConfigError::Validation(
                "pyramid.quality must be 1-100".into(),
            ));
        }
        if self.trigger.min_dimension == 0 {
            return Err(ConfigError::Validation(
                "trigger.min_dimension must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Tile geometry and encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PyramidConfig {
    /// Tile edge length in pixels, not counting overlap.
    pub tile_size: u32,
    /// Pixels each tile extends into its neighbours on interior edges.
    pub overlap: u32,
    /// Encoded tile format; also written as the descriptor's `Format`.
    pub format: TileFormat,
    /// Lossy encoding quality (1 = worst, 100 = best). Ignored for PNG.
    pub quality: u32,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            tile_size: 256,
            overlap: 1,
            format: TileFormat::Jpeg,
            quality: 85,
        }
    }
}

impl PyramidConfig {
    /// Tile settings in the form the imaging operations take.
    pub fn tile_config(&self) -> TileConfig {
        TileConfig {
            tile_size: self.tile_size,
            overlap: self.overlap,
            encode: EncodeParams {
                format: self.format,
                quality: Quality::new(self.quality),
            },
        }
    }
}

/// When callers should generate a pyramid at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerConfig {
    /// Minimum longer-edge size, in pixels, for an image to get a pyramid.
    pub min_dimension: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            min_dimension: 3000,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of images tiled in parallel by a batch.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Config::default())
        .map_err(|e| ConfigError::Validation(format!("default config does not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// A missing file yields the validated stock defaults. Otherwise user values
/// are merged on top of the defaults, unknown keys are rejected, and the
/// result is validated.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = if path.exists() {
        let content = fs::read_to_string(path)?;
        Some(toml::from_str::<toml::Value>(&content)?)
    } else {
        None
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# DZI Pyramid Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Tile pyramid
# ---------------------------------------------------------------------------
[pyramid]
# Tile edge length in pixels, not counting overlap.
tile_size = 256

# Pixels each tile shares with its neighbours on interior edges, so the
# viewer can blend seams. Must be smaller than tile_size.
overlap = 1

# Tile format: "jpg" or "png". Written into the .dzi descriptor as Format.
format = "jpg"

# JPEG quality (1 = worst, 100 = best). Ignored for png.
quality = 85

# ---------------------------------------------------------------------------
# Trigger policy (applied by callers, e.g. `generate --only-large`)
# ---------------------------------------------------------------------------
[trigger]
# Only images whose longer edge is at least this many pixels get a pyramid.
min_dimension = 3000

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of images tiled in parallel by a batch run.
# Each image is still tiled on a single thread.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
