//! Pyramid generation: validate, plan, render, slice, commit.
//!
//! [`generate`] turns one source image into a complete Deep Zoom pyramid
//! under an output directory:
//!
//! ```text
//! Validating ─┬─► AlreadyComplete (skipped)
//!             └─► Planning ─► Rendering(L) ─► Slicing(L) ─► … ─► Descriptor ─► Done
//!                    any step ─► Failed (tile tree removed)
//! ```
//!
//! ## Atomicity
//!
//! The descriptor is written last and is the commit point other code uses to
//! detect a finished pyramid. Until it lands, a rollback guard owns the
//! tile tree; every early return (including `?`) drops the guard, which
//! deletes the tile root, so a half-built pyramid never survives a failure.
//!
//! ## Concurrency
//!
//! One invocation is single-threaded and holds no state beyond the
//! filesystem. Concurrent invocations for *different* images need no
//! coordination. For the *same* image, a lock file (`.{name}.lock`, created
//! with create-new semantics) makes the second caller fail with
//! [`PyramidError::Locked`] instead of interleaving writes. A lock left by a
//! killed process must be removed by hand.
//!
//! ## Memory
//!
//! The oriented source stays decoded for the whole run; each level is
//! resampled from it, sliced tile by tile, and dropped before the next level
//! is rendered.

use crate::config::{Config, ConfigError, TriggerConfig, effective_threads};
use crate::descriptor::Descriptor;
use crate::imaging::{
    BackendError, Dimensions, ImageBackend, RustBackend, TileConfig, plan_levels, render_level, slice_level,
};
use crate::layout::{PyramidPaths, pyramid_name};
use image::DynamicImage;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PyramidError {
    #[error("Invalid source {path}: {reason}")]
    InvalidSource { path: PathBuf, reason: String },
    #[error("Failed to create {path}: {source}")]
    DirectoryCreate { path: PathBuf, source: io::Error },
    #[error("Failed to encode level {level}: {reason}")]
    Encode { level: u32, reason: String },
    #[error("Failed to write descriptor {path}: {source}")]
    DescriptorWrite { path: PathBuf, source: io::Error },
    #[error("Pyramid is locked by another generator: {path}")]
    Locked { path: PathBuf },
    #[error("Failed to create lock file {path}: {source}")]
    Lock { path: PathBuf, source: io::Error },
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
}

impl PyramidError {
    /// Stable machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            PyramidError::InvalidSource { .. } => "invalid_source",
            PyramidError::DirectoryCreate { .. } => "directory_create",
            PyramidError::Encode { .. } => "encode",
            PyramidError::DescriptorWrite { .. } => "descriptor_write",
            PyramidError::Locked { .. } => "locked",
            PyramidError::Lock { .. } => "lock",
            PyramidError::Config(_) => "config",
        }
    }
}

fn invalid_source(path: &Path, reason: impl Into<String>) -> PyramidError {
    PyramidError::InvalidSource {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Outcome of a successful (or skipped) generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyramidSummary {
    pub name: String,
    pub descriptor: PathBuf,
    /// Original (oriented) source dimensions.
    pub dimensions: Dimensions,
    pub level_count: u32,
    pub tile_count: u64,
    /// True when a complete pyramid already existed and nothing was written.
    pub skipped: bool,
}

/// Flat result record handed to callers that report over JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PyramidReport {
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<&'static str>,
    pub tile_count: u64,
    pub level_count: u32,
    pub dimensions: Option<Dimensions>,
    pub skipped: bool,
    pub descriptor: Option<PathBuf>,
}

impl PyramidReport {
    pub fn from_result(result: &Result<PyramidSummary, PyramidError>) -> Self {
        match result {
            Ok(summary) => Self {
                success: true,
                error: None,
                error_kind: None,
                tile_count: summary.tile_count,
                level_count: summary.level_count,
                dimensions: Some(summary.dimensions),
                skipped: summary.skipped,
                descriptor: Some(summary.descriptor.clone()),
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
                error_kind: Some(e.kind()),
                tile_count: 0,
                level_count: 0,
                dimensions: None,
                skipped: false,
                descriptor: None,
            },
        }
    }
}

// ============================================================================
// Rollback and locking
// ============================================================================

/// Owns a pyramid's partially written state, and its lock, until
/// [`Rollback::commit`].
///
/// Dropping an uncommitted guard deletes the tile root (if this run created
/// it), then releases the lock, then removes the base directory (if this run
/// created it and it is now empty). The lock is held until the tile tree is
/// gone.
struct Rollback {
    paths: PyramidPaths,
    lock: Option<PyramidLock>,
    created_base: bool,
    created_tiles: bool,
    committed: bool,
}

impl Rollback {
    fn new(paths: &PyramidPaths) -> Self {
        Self {
            paths: paths.clone(),
            lock: None,
            created_base: false,
            created_tiles: false,
            committed: false,
        }
    }

    fn create_base(&mut self) -> Result<(), PyramidError> {
        let base = self.paths.base();
        if base.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(base).map_err(|source| PyramidError::DirectoryCreate {
            path: base.to_path_buf(),
            source,
        })?;
        self.created_base = true;
        Ok(())
    }

    fn acquire_lock(&mut self) -> Result<(), PyramidError> {
        self.lock = Some(PyramidLock::acquire(&self.paths)?);
        Ok(())
    }

    /// Remove a descriptor whose tile tree is gone, so a failed rebuild can
    /// never leave it looking complete. Requires the lock.
    fn clear_stale_descriptor(&self) -> Result<(), PyramidError> {
        let descriptor = self.paths.descriptor();
        if descriptor.is_file() {
            warn!(path = %descriptor.display(), "removing descriptor without tiles");
            fs::remove_file(&descriptor).map_err(|source| PyramidError::DescriptorWrite {
                path: descriptor.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Create a fresh tile root, clearing leftovers from an earlier run that
    /// never wrote its descriptor. Requires the lock.
    fn create_tiles_dir(&mut self) -> Result<(), PyramidError> {
        let tiles = self.paths.tiles_dir();
        let to_err = |source: io::Error| PyramidError::DirectoryCreate {
            path: tiles.clone(),
            source,
        };
        if tiles.is_dir() {
            warn!(path = %tiles.display(), "removing incomplete tile tree");
            fs::remove_dir_all(&tiles).map_err(to_err)?;
        }
        fs::create_dir(&tiles).map_err(to_err)?;
        self.created_tiles = true;
        Ok(())
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if self.created_tiles {
            let tiles = self.paths.tiles_dir();
            warn!(path = %tiles.display(), "rolling back partial pyramid");
            if let Err(e) = fs::remove_dir_all(&tiles) {
                warn!(path = %tiles.display(), error = %e, "rollback could not remove tile tree");
            }
        }
        drop(self.lock.take());
        if self.created_base {
            // Fails harmlessly when another pyramid now lives there
            let _ = fs::remove_dir(self.paths.base());
        }
    }
}

/// Per-image advisory lock, released on drop.
struct PyramidLock {
    path: PathBuf,
}

impl PyramidLock {
    fn acquire(paths: &PyramidPaths) -> Result<Self, PyramidError> {
        let path = paths.lock_path();
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(PyramidError::Locked { path })
            }
            Err(source) => Err(PyramidError::Lock { path, source }),
        }
    }
}

impl Drop for PyramidLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "could not release pyramid lock");
        }
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Generate a pyramid for `source` under `output_dir` with the default backend.
pub fn generate(
    source: &Path,
    output_dir: &Path,
    config: &Config,
) -> Result<PyramidSummary, PyramidError> {
    generate_with_backend(&RustBackend::new(), source, output_dir, config)
}

/// Generate a pyramid using a specific backend (allows testing with mock).
pub fn generate_with_backend(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    config: &Config,
) -> Result<PyramidSummary, PyramidError> {
    config.validate()?;
    let name = pyramid_name(source).ok_or_else(|| invalid_source(source, "no file name"))?;
    let paths = PyramidPaths::new(output_dir, name);

    let identified = identify_source(backend, source)?;

    if paths.is_complete() {
        return Ok(skipped_summary(&paths, identified));
    }

    // Decode before touching the filesystem: a bad source leaves no trace
    let image = backend
        .load(source)
        .map_err(|e| invalid_source(source, e.to_string()))?;
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    if dimensions.width == 0 || dimensions.height == 0 {
        return Err(invalid_source(source, "decoded image has a zero dimension"));
    }

    info!(
        source = %source.display(),
        width = dimensions.width,
        height = dimensions.height,
        "generating pyramid"
    );

    let mut rollback = Rollback::new(&paths);
    rollback.create_base()?;
    rollback.acquire_lock()?;

    // Another generator may have finished between the first check and the lock
    if paths.is_complete() {
        rollback.commit();
        return Ok(skipped_summary(&paths, dimensions));
    }

    rollback.clear_stale_descriptor()?;
    rollback.create_tiles_dir()?;
    let tiles = config.pyramid.tile_config();
    let (level_count, tile_count) = build_levels(backend, &image, &paths, &tiles)?;
    drop(image);

    let descriptor_path = paths.descriptor();
    Descriptor {
        tile_size: tiles.tile_size,
        overlap: tiles.overlap,
        format: tiles.encode.format,
        width: dimensions.width,
        height: dimensions.height,
    }
    .write_atomic(&descriptor_path)
    .map_err(|source| PyramidError::DescriptorWrite {
        path: descriptor_path.clone(),
        source,
    })?;
    rollback.commit();

    info!(
        descriptor = %descriptor_path.display(),
        levels = level_count,
        tiles = tile_count,
        "pyramid complete"
    );

    Ok(PyramidSummary {
        name: paths.name().to_string(),
        descriptor: descriptor_path,
        dimensions,
        level_count,
        tile_count,
        skipped: false,
    })
}

/// Confirm the source exists, is non-empty, and has a readable header.
fn identify_source(backend: &impl ImageBackend, source: &Path) -> Result<Dimensions, PyramidError> {
    let metadata = fs::metadata(source).map_err(|e| invalid_source(source, e.to_string()))?;
    if !metadata.is_file() {
        return Err(invalid_source(source, "not a regular file"));
    }
    if metadata.len() == 0 {
        return Err(invalid_source(source, "file is empty"));
    }
    let dims = backend
        .identify(source)
        .map_err(|e| invalid_source(source, e.to_string()))?;
    if dims.width == 0 || dims.height == 0 {
        return Err(invalid_source(source, "image has a zero dimension"));
    }
    Ok(dims)
}

fn skipped_summary(paths: &PyramidPaths, dimensions: Dimensions) -> PyramidSummary {
    let (level_count, tile_count) = paths.count_existing();
    info!(descriptor = %paths.descriptor().display(), "pyramid already exists, skipping");
    PyramidSummary {
        name: paths.name().to_string(),
        descriptor: paths.descriptor(),
        dimensions,
        level_count,
        tile_count,
        skipped: true,
    }
}

/// Render and slice every level, full resolution first. Returns
/// `(levels, tiles)` written.
fn build_levels(
    backend: &impl ImageBackend,
    source: &DynamicImage,
    paths: &PyramidPaths,
    tiles: &TileConfig,
) -> Result<(u32, u64), PyramidError> {
    let levels = plan_levels(source.width(), source.height());
    let mut tile_count = 0u64;

    for level in levels.iter().rev() {
        let dir = paths.level_dir(level.index);
        fs::create_dir(&dir).map_err(|source| PyramidError::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;

        let raster = render_level(backend, source, level).map_err(|e| PyramidError::Encode {
            level: level.index,
            reason: e.to_string(),
        })?;
        let written = slice_level(backend, &raster, tiles, &dir).map_err(|e| {
            PyramidError::Encode {
                level: level.index,
                reason: e.to_string(),
            }
        })?;

        debug!(
            level = level.index,
            width = level.width,
            height = level.height,
            tiles = written,
            "level written"
        );
        tile_count += u64::from(written);
    }

    Ok((levels.len() as u32, tile_count))
}

// ============================================================================
// Caller helpers
// ============================================================================

/// How a source measures up against the trigger threshold.
#[derive(Debug)]
pub enum Eligibility {
    Eligible(Dimensions),
    BelowThreshold(Dimensions),
    Unreadable(BackendError),
}

/// Classify `source` against `trigger` by reading its header.
pub fn check_trigger(
    backend: &impl ImageBackend,
    source: &Path,
    trigger: &TriggerConfig,
) -> Eligibility {
    match backend.identify(source) {
        Ok(d) if d.width.max(d.height) >= trigger.min_dimension => Eligibility::Eligible(d),
        Ok(d) => Eligibility::BelowThreshold(d),
        Err(e) => Eligibility::Unreadable(e),
    }
}

/// Whether `source` is large enough to warrant a pyramid under `trigger`.
///
/// Unreadable sources are never eligible. This is caller policy; the
/// generator itself tiles whatever it is given.
pub fn should_generate(
    backend: &impl ImageBackend,
    source: &Path,
    trigger: &TriggerConfig,
) -> bool {
    matches!(
        check_trigger(backend, source, trigger),
        Eligibility::Eligible(_)
    )
}

/// One source image and where its pyramid goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub source: PathBuf,
    pub output_dir: PathBuf,
}

/// Result of one batch job.
#[derive(Debug)]
pub struct BatchOutcome {
    pub source: PathBuf,
    pub result: Result<PyramidSummary, PyramidError>,
}

/// Generate pyramids for several images in parallel with the default backend.
pub fn generate_batch(jobs: &[BatchJob], config: &Config) -> Vec<BatchOutcome> {
    generate_batch_with_backend(&RustBackend::new(), jobs, config)
}

/// Generate pyramids for several images in parallel.
///
/// Each image is still tiled on one thread; parallelism is across images,
/// capped by `processing.max_processes`. Outcomes keep the order of `jobs`.
pub fn generate_batch_with_backend(
    backend: &impl ImageBackend,
    jobs: &[BatchJob],
    config: &Config,
) -> Vec<BatchOutcome> {
    let run = |job: &BatchJob| BatchOutcome {
        source: job.source.clone(),
        result: generate_with_backend(backend, &job.source, &job.output_dir, config),
    };

    let threads = effective_threads(&config.processing);
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| jobs.par_iter().map(run).collect()),
        Err(e) => {
            warn!(error = %e, "thread pool unavailable, tiling sequentially");
            jobs.iter().map(run).collect()
        }
    }
}
