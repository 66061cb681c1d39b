//! Pure calculation functions for pyramid geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! Deep Zoom numbers levels from 0 (a 1×1 image) up to `max_level` (full
//! resolution). Level `L` is the source downscaled by `2^(max_level - L)`,
//! rounding up, so every level is at least 1×1.

/// One resolution step of the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidLevel {
    /// 0 = smallest (1×1), `max_level` = full resolution.
    pub index: u32,
    pub width: u32,
    pub height: u32,
}

/// Highest level index for an image: `ceil(log2(max(width, height)))`.
///
/// Computed with integer bit math so large powers of two don't suffer
/// floating-point rounding. Degenerate input (`0`) is treated like `1`.
///
/// # Examples
/// ```
/// # use dzi_pyramid::imaging::calculations::max_level;
/// assert_eq!(max_level(4000, 3000), 12);
/// assert_eq!(max_level(4096, 4096), 12);
/// assert_eq!(max_level(4097, 1), 13);
/// assert_eq!(max_level(1, 1), 0);
/// ```
pub fn max_level(width: u32, height: u32) -> u32 {
    let longest = width.max(height).max(1);
    u32::BITS - (longest - 1).leading_zeros()
}

/// Dimensions of `level` for a `width`×`height` source.
///
/// `ceil(dim / 2^(max_level - level))`. Returns `None` for a level above
/// `max_level`.
pub fn level_dimensions(width: u32, height: u32, level: u32) -> Option<(u32, u32)> {
    let top = max_level(width, height);
    if level > top {
        return None;
    }
    let scale = 1u64 << (top - level);
    let w = (width as u64).div_ceil(scale) as u32;
    let h = (height as u64).div_ceil(scale) as u32;
    Some((w, h))
}

/// Plan every pyramid level for a source, ordered from level 0 to `max_level`.
///
/// Levels with a zero dimension are skipped; that only happens for a
/// degenerate 0-sized source, which callers reject before planning.
pub fn plan_levels(width: u32, height: u32) -> Vec<PyramidLevel> {
    let top = max_level(width, height);
    (0..=top)
        .filter_map(|index| {
            let (w, h) = level_dimensions(width, height, index)?;
            (w >= 1 && h >= 1).then_some(PyramidLevel {
                index,
                width: w,
                height: h,
            })
        })
        .collect()
}

/// A tile's crop rectangle within one level raster.
///
/// `x`/`y`/`width`/`height` are the crop region *including* overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub col: u32,
    pub row: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    /// The tile's own region without overlap: `[col*ts, min((col+1)*ts, W))`
    /// horizontally, and the same vertically. Returned as `(x, y, w, h)`.
    pub fn core(&self, level_width: u32, level_height: u32, tile_size: u32) -> (u32, u32, u32, u32) {
        let x = self.col * tile_size;
        let y = self.row * tile_size;
        let w = tile_size.min(level_width - x);
        let h = tile_size.min(level_height - y);
        (x, y, w, h)
    }
}

/// Number of tile columns and rows for a level.
pub fn grid_size(level_width: u32, level_height: u32, tile_size: u32) -> (u32, u32) {
    (
        level_width.div_ceil(tile_size),
        level_height.div_ceil(tile_size),
    )
}

/// Span of one tile along a single axis: `(start, length)`.
///
/// Overlap is added on the leading edge unless this is the first tile and on
/// the trailing edge unless it is the last; the end is clamped to the level
/// size so boundary tiles are clipped, never padded.
fn axis_span(index: u32, count: u32, tile_size: u32, overlap: u32, extent: u32) -> (u32, u32) {
    let base = index * tile_size;
    let start = if index > 0 {
        base.saturating_sub(overlap)
    } else {
        base
    };
    let trailing = if index + 1 < count { overlap } else { 0 };
    let end = (base + tile_size + trailing).min(extent);
    (start, end - start)
}

/// Compute every tile rectangle for one level, row-major.
///
/// `tile_size` must be non-zero (enforced by config validation).
///
/// # Examples
/// ```
/// # use dzi_pyramid::imaging::calculations::tile_grid;
/// // 600×300 level, 256px tiles, 1px overlap → 3×2 grid
/// let tiles = tile_grid(600, 300, 256, 1);
/// assert_eq!(tiles.len(), 6);
/// // Last column: 600 - 2*256 = 88 wide, plus 1px of left overlap
/// assert_eq!(tiles[2].width, 89);
/// ```
pub fn tile_grid(level_width: u32, level_height: u32, tile_size: u32, overlap: u32) -> Vec<TileRect> {
    let (cols, rows) = grid_size(level_width, level_height, tile_size);
    let mut tiles = Vec::with_capacity((cols as usize) * (rows as usize));

    for row in 0..rows {
        let (y, height) = axis_span(row, rows, tile_size, overlap, level_height);
        for col in 0..cols {
            let (x, width) = axis_span(col, cols, tile_size, overlap, level_width);
            tiles.push(TileRect {
                col,
                row,
                x,
                y,
                width,
                height,
            });
        }
    }

    tiles
}

/// Total tile count across all planned levels.
pub fn pyramid_tile_count(levels: &[PyramidLevel], tile_size: u32) -> u64 {
    levels
        .iter()
        .map(|l| {
            let (cols, rows) = grid_size(l.width, l.height, tile_size);
            cols as u64 * rows as u64
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Level planning
    // =========================================================================

    #[test]
    fn level_count_for_photo_sized_source() {
        let levels = plan_levels(4000, 3000);
        assert_eq!(levels.len(), 13);
        assert_eq!(levels.last().unwrap().index, 12);
    }

    #[test]
    fn single_pixel_source_has_one_level() {
        let levels = plan_levels(1, 1);
        assert_eq!(
            levels,
            vec![PyramidLevel {
                index: 0,
                width: 1,
                height: 1
            }]
        );
    }

    #[test]
    fn two_pixel_source_has_two_levels() {
        assert_eq!(max_level(2, 1), 1);
        let levels = plan_levels(2, 1);
        assert_eq!(levels.len(), 2);
        assert_eq!((levels[0].width, levels[0].height), (1, 1));
        assert_eq!((levels[1].width, levels[1].height), (2, 1));
    }

    #[test]
    fn level_count_matches_log2_formula() {
        for &(w, h) in &[(3, 5), (255, 17), (256, 256), (257, 1), (1000, 600), (1, 70_000)] {
            let expected = (w.max(h) as f64).log2().ceil() as usize + 1;
            assert_eq!(plan_levels(w, h).len(), expected, "source {w}x{h}");
        }
    }

    #[test]
    fn top_level_is_full_resolution() {
        let levels = plan_levels(1000, 600);
        let top = levels.last().unwrap();
        assert_eq!((top.width, top.height), (1000, 600));
    }

    #[test]
    fn bottom_level_is_one_by_one() {
        for &(w, h) in &[(1000, 600), (4096, 4096), (7, 3000)] {
            let levels = plan_levels(w, h);
            assert_eq!((levels[0].width, levels[0].height), (1, 1), "source {w}x{h}");
        }
    }

    #[test]
    fn levels_halve_with_ceiling() {
        let levels = plan_levels(1000, 600);
        for pair in levels.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            assert_eq!(lower.index + 1, upper.index);
            assert_eq!(lower.width, upper.width.div_ceil(2));
            assert_eq!(lower.height, upper.height.div_ceil(2));
        }
    }

    #[test]
    fn level_dimensions_uses_ceiling() {
        // 1000x600 has max level 10; level 9 is /2, level 8 is /4
        assert_eq!(level_dimensions(1000, 600, 10), Some((1000, 600)));
        assert_eq!(level_dimensions(1000, 600, 9), Some((500, 300)));
        assert_eq!(level_dimensions(1000, 600, 3), Some((8, 5)));
        assert_eq!(level_dimensions(1000, 600, 11), None);
    }

    #[test]
    fn max_level_handles_largest_dimension() {
        assert_eq!(max_level(u32::MAX, 1), 32);
        let levels = plan_levels(u32::MAX, 1);
        assert_eq!(levels.len(), 33);
        assert_eq!(levels[0].width, 1);
    }

    #[test]
    fn max_level_treats_zero_like_one() {
        assert_eq!(max_level(0, 0), 0);
    }

    // =========================================================================
    // Tile grid
    // =========================================================================

    fn assert_partition(level_w: u32, level_h: u32, tile_size: u32, overlap: u32) {
        let tiles = tile_grid(level_w, level_h, tile_size, overlap);
        let mut covered = vec![0u8; (level_w * level_h) as usize];
        let mut area = 0u64;

        for t in &tiles {
            let (x, y, w, h) = t.core(level_w, level_h, tile_size);
            area += w as u64 * h as u64;
            // Core region must lie inside the crop region
            assert!(t.x <= x && x + w <= t.x + t.width, "tile {t:?}");
            assert!(t.y <= y && y + h <= t.y + t.height, "tile {t:?}");
            // Crop region never exceeds the level
            assert!(t.x + t.width <= level_w && t.y + t.height <= level_h, "tile {t:?}");
            for py in y..y + h {
                for px in x..x + w {
                    covered[(py * level_w + px) as usize] += 1;
                }
            }
        }

        assert_eq!(area, level_w as u64 * level_h as u64);
        assert!(covered.iter().all(|&c| c == 1), "gap or double coverage");
    }

    #[test]
    fn core_regions_partition_the_level() {
        assert_partition(1000, 600, 256, 1);
        assert_partition(256, 256, 256, 1);
        assert_partition(257, 255, 256, 1);
        assert_partition(1, 1, 256, 1);
        assert_partition(100, 37, 16, 3);
        assert_partition(513, 512, 256, 0);
    }

    #[test]
    fn grid_for_exact_multiple_has_no_clipping() {
        let tiles = tile_grid(4096, 4096, 256, 1);
        assert_eq!(tiles.len(), 256);
        assert_eq!(grid_size(4096, 4096, 256), (16, 16));
        // Interior tile: full size plus overlap on both sides
        let interior = tiles.iter().find(|t| t.col == 5 && t.row == 5).unwrap();
        assert_eq!((interior.x, interior.y), (5 * 256 - 1, 5 * 256 - 1));
        assert_eq!((interior.width, interior.height), (258, 258));
        // Last tile: overlap on the leading edges only
        let last = tiles.last().unwrap();
        assert_eq!((last.col, last.row), (15, 15));
        assert_eq!((last.width, last.height), (257, 257));
    }

    #[test]
    fn first_tile_has_no_leading_overlap() {
        let tiles = tile_grid(1000, 600, 256, 1);
        let first = tiles[0];
        assert_eq!((first.x, first.y), (0, 0));
        assert_eq!((first.width, first.height), (257, 257));
    }

    #[test]
    fn boundary_column_is_clipped() {
        // 1000 = 3*256 + 232 → last column core is 232 wide
        let tiles = tile_grid(1000, 600, 256, 1);
        let (cols, _) = grid_size(1000, 600, 256);
        assert_eq!(cols, 4);
        for t in tiles.iter().filter(|t| t.col == cols - 1) {
            assert_eq!(t.x, 3 * 256 - 1);
            assert_eq!(t.width, 1000 - 3 * 256 + 1);
        }
    }

    #[test]
    fn single_column_boundary_has_no_overlap() {
        // Only one column: it is both first and last
        let tiles = tile_grid(100, 600, 256, 1);
        assert!(tiles.iter().all(|t| t.x == 0 && t.width == 100));
    }

    #[test]
    fn tiles_are_row_major() {
        let tiles = tile_grid(600, 300, 256, 1);
        let order: Vec<(u32, u32)> = tiles.iter().map(|t| (t.col, t.row)).collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn overlap_larger_than_remaining_edge_is_clamped() {
        // 258 wide: column 1 core is 2 pixels, overlap 3 → starts 3 left
        let tiles = tile_grid(258, 10, 256, 3);
        assert_eq!(tiles.len(), 2);
        assert_eq!((tiles[0].x, tiles[0].width), (0, 258));
        assert_eq!((tiles[1].x, tiles[1].width), (253, 5));
    }

    #[test]
    fn tile_count_for_square_pyramid() {
        let levels = plan_levels(4096, 4096);
        // 256 + 64 + 16 + 4 + 1 tiles for levels 12..8, then one per level 7..0
        assert_eq!(pyramid_tile_count(&levels, 256), 256 + 64 + 16 + 4 + 1 + 8);
    }
}
