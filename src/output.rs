//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! art_abc123 (4000×3000)
//!     Source: uploads/art_abc123.jpg
//!     Descriptor: uploads/dzi/art_abc123.dzi
//!     13 levels, 252 tiles
//! sketch (900×600)
//!     Source: uploads/sketch.jpg
//!     Descriptor: uploads/dzi/sketch.dzi
//!     cached
//! broken.jpg
//!     Error: Invalid source broken.jpg: file is empty
//!
//! Generated 1 pyramid, 1 cached, 1 failed
//! ```
//!
//! ## Plan
//!
//! ```text
//! art_abc123 (4000×3000)
//!     Tiles: 256px, overlap 1, jpg q85
//!     Trigger: eligible (longest edge ≥ 3000px)
//!     Level 12    4000×3000    16×12
//!     ...
//!     Level  0       1×1        1×1
//! 13 levels, 252 tiles
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::Config;
use crate::imaging::Dimensions;
use crate::imaging::calculations::{grid_size, plan_levels, pyramid_tile_count};
use crate::layout::Removed;
use crate::pyramid::PyramidReport;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn dims(d: Dimensions) -> String {
    format!("{}×{}", d.width, d.height)
}

fn plural(n: u64, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

// ============================================================================
// Generate
// ============================================================================

/// Format the result of one generation.
pub fn format_report(source: &Path, report: &PyramidReport) -> Vec<String> {
    let mut lines = Vec::new();
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    match (report.success, report.dimensions) {
        (true, Some(d)) => lines.push(format!("{} ({})", stem, dims(d))),
        _ => lines.push(
            source
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| source.display().to_string()),
        ),
    }

    if !report.success {
        if let Some(error) = &report.error {
            lines.push(format!("{}Error: {}", indent(1), error));
        }
        return lines;
    }

    lines.push(format!("{}Source: {}", indent(1), source.display()));
    if let Some(descriptor) = &report.descriptor {
        lines.push(format!("{}Descriptor: {}", indent(1), descriptor.display()));
    }
    if report.skipped {
        lines.push(format!("{}cached", indent(1)));
    } else {
        lines.push(format!(
            "{}{}, {}",
            indent(1),
            plural(u64::from(report.level_count), "level"),
            plural(report.tile_count, "tile")
        ));
    }
    lines
}

/// Closing line of a `generate` run.
pub fn format_totals(reports: &[PyramidReport]) -> String {
    let generated = reports.iter().filter(|r| r.success && !r.skipped).count() as u64;
    let cached = reports.iter().filter(|r| r.skipped).count();
    let failed = reports.iter().filter(|r| !r.success).count();

    let mut line = format!("Generated {}", plural(generated, "pyramid"));
    if cached > 0 {
        line.push_str(&format!(", {} cached", cached));
    }
    if failed > 0 {
        line.push_str(&format!(", {} failed", failed));
    }
    line
}

pub fn print_report(source: &Path, report: &PyramidReport) {
    for line in format_report(source, report) {
        println!("{}", line);
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Format the level table a `generate` run would produce, without writing.
pub fn format_plan(source: &Path, dimensions: Dimensions, config: &Config) -> Vec<String> {
    let pyramid = &config.pyramid;
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut lines = vec![format!("{} ({})", stem, dims(dimensions))];

    let quality = if pyramid.format.is_lossy() {
        format!(" q{}", pyramid.quality)
    } else {
        String::new()
    };
    lines.push(format!(
        "{}Tiles: {}px, overlap {}, {}{}",
        indent(1),
        pyramid.tile_size,
        pyramid.overlap,
        pyramid.format,
        quality
    ));

    let longest = dimensions.width.max(dimensions.height);
    let min = config.trigger.min_dimension;
    let verdict = if longest >= min {
        format!("eligible (longest edge ≥ {}px)", min)
    } else {
        format!("below threshold (longest edge < {}px)", min)
    };
    lines.push(format!("{}Trigger: {}", indent(1), verdict));

    let levels = plan_levels(dimensions.width, dimensions.height);
    for level in levels.iter().rev() {
        let (cols, rows) = grid_size(level.width, level.height, pyramid.tile_size);
        lines.push(format!(
            "{}Level {:>2}  {:>11}  {:>7}",
            indent(1),
            level.index,
            format!("{}×{}", level.width, level.height),
            format!("{}×{}", cols, rows)
        ));
    }

    lines.push(format!(
        "{}, {}",
        plural(levels.len() as u64, "level"),
        plural(pyramid_tile_count(&levels, pyramid.tile_size), "tile")
    ));
    lines
}

pub fn print_plan(source: &Path, dimensions: Dimensions, config: &Config) {
    for line in format_plan(source, dimensions, config) {
        println!("{}", line);
    }
}

// ============================================================================
// Remove
// ============================================================================

pub fn format_removed(name: &str, removed: &Removed) -> Vec<String> {
    let mut parts = Vec::new();
    if removed.descriptor {
        parts.push("descriptor");
    }
    if removed.tiles_dir {
        parts.push("tiles");
    }
    if parts.is_empty() {
        vec![format!("{}: nothing to remove", name)]
    } else {
        vec![format!("{}: removed {}", name, parts.join(", "))]
    }
}

pub fn print_removed(name: &str, removed: &Removed) {
    for line in format_removed(name, removed) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::TileFormat;
    use std::path::PathBuf;

    fn success(skipped: bool) -> PyramidReport {
        PyramidReport {
            success: true,
            error: None,
            error_kind: None,
            tile_count: 252,
            level_count: 13,
            dimensions: Some(Dimensions {
                width: 4000,
                height: 3000,
            }),
            skipped,
            descriptor: Some(PathBuf::from("uploads/dzi/art.dzi")),
        }
    }

    fn failure() -> PyramidReport {
        PyramidReport {
            success: false,
            error: Some("Invalid source broken.jpg: file is empty".into()),
            error_kind: Some("invalid_source"),
            tile_count: 0,
            level_count: 0,
            dimensions: None,
            skipped: false,
            descriptor: None,
        }
    }

    // =========================================================================
    // Generate
    // =========================================================================

    #[test]
    fn generated_report_lists_counts() {
        let lines = format_report(Path::new("uploads/art.jpg"), &success(false));
        assert_eq!(
            lines,
            vec![
                "art (4000×3000)",
                "    Source: uploads/art.jpg",
                "    Descriptor: uploads/dzi/art.dzi",
                "    13 levels, 252 tiles",
            ]
        );
    }

    #[test]
    fn skipped_report_says_cached() {
        let lines = format_report(Path::new("uploads/art.jpg"), &success(true));
        assert_eq!(lines.last().unwrap(), "    cached");
    }

    #[test]
    fn failed_report_shows_error_only() {
        let lines = format_report(Path::new("uploads/broken.jpg"), &failure());
        assert_eq!(
            lines,
            vec![
                "broken.jpg",
                "    Error: Invalid source broken.jpg: file is empty",
            ]
        );
    }

    #[test]
    fn single_level_uses_singular() {
        let report = PyramidReport {
            level_count: 1,
            tile_count: 1,
            ..success(false)
        };
        let lines = format_report(Path::new("dot.png"), &report);
        assert_eq!(lines.last().unwrap(), "    1 level, 1 tile");
    }

    #[test]
    fn totals_mention_only_nonzero_groups() {
        assert_eq!(format_totals(&[success(false)]), "Generated 1 pyramid");
        assert_eq!(
            format_totals(&[success(false), success(false), success(true), failure()]),
            "Generated 2 pyramids, 1 cached, 1 failed"
        );
        assert_eq!(format_totals(&[]), "Generated 0 pyramids");
    }

    // =========================================================================
    // Plan
    // =========================================================================

    #[test]
    fn plan_lists_levels_largest_first() {
        let lines = format_plan(
            Path::new("art.jpg"),
            Dimensions {
                width: 1000,
                height: 600,
            },
            &Config::default(),
        );

        assert_eq!(lines[0], "art (1000×600)");
        assert_eq!(lines[1], "    Tiles: 256px, overlap 1, jpg q85");
        assert_eq!(lines[2], "    Trigger: below threshold (longest edge < 3000px)");
        assert!(lines[3].starts_with("    Level 10"));
        assert!(lines[3].contains("1000×600") && lines[3].ends_with("4×3"));
        assert!(lines[13].starts_with("    Level  0"));
        assert_eq!(lines[14], "11 levels, 25 tiles");
        assert_eq!(lines.len(), 15);
    }

    #[test]
    fn plan_omits_quality_for_png() {
        let mut config = Config::default();
        config.pyramid.format = TileFormat::Png;
        config.trigger.min_dimension = 500;
        let lines = format_plan(
            Path::new("art.png"),
            Dimensions {
                width: 1000,
                height: 600,
            },
            &config,
        );
        assert_eq!(lines[1], "    Tiles: 256px, overlap 1, png");
        assert_eq!(lines[2], "    Trigger: eligible (longest edge ≥ 500px)");
    }

    // =========================================================================
    // Remove
    // =========================================================================

    #[test]
    fn removed_lists_deleted_parts() {
        let both = Removed {
            descriptor: true,
            tiles_dir: true,
        };
        assert_eq!(format_removed("art", &both), vec!["art: removed descriptor, tiles"]);

        let tiles_only = Removed {
            descriptor: false,
            tiles_dir: true,
        };
        assert_eq!(format_removed("art", &tiles_only), vec!["art: removed tiles"]);

        assert_eq!(
            format_removed("art", &Removed::default()),
            vec!["art: nothing to remove"]
        );
    }
}
