//! Adaptive political/biome overlay.
//!
//! A quad-tree style subdivision of the palette raster: homogeneous regions
//! collapse into one rectangle while coastlines and borders keep near-pixel
//! resolution. The build uses an explicit stack, so depth is bounded by the
//! cell cap rather than the call stack.

use serde::{Deserialize, Serialize};

use crate::tilemap::Tilemap;
use crate::world::{AdaptiveCell, NO_COUNTRY, PALETTE_BIOME_OFFSET, PALETTE_DEEP_WATER, PALETTE_SHALLOW_WATER};

/// Rectangles with a deep/shallow water mix and more cells than this are
/// always split.
const WATER_MIX_MIN_AREA: usize = 4;

/// Parameters for the adaptive cell build
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Fraction of a rectangle the majority palette index must cover
    pub majority_threshold: f32,
    /// Safety cap on emitted rectangles
    pub max_cells: usize,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            majority_threshold: 0.99,
            max_cells: 200_000,
        }
    }
}

/// A leaf rectangle in raster cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
    pub palette_index: u16,
}

impl GridRect {
    pub fn area(&self) -> usize {
        self.w * self.h
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdaptiveStats {
    pub cells: usize,
    pub splits: usize,
    /// Splits caused only by a deep/shallow water mix
    pub forced_water_splits: usize,
    /// The cell cap was reached before the stack drained; the output does
    /// not cover the whole raster.
    pub truncated: bool,
}

#[derive(Clone, Copy)]
struct Node {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

/// Outcome of scanning one rectangle
struct Survey {
    candidate: u16,
    fraction: f32,
    water_mix: bool,
}

/// Builds adaptive cells over a palette raster.
pub struct AdaptiveCellBuilder<'a> {
    palette: &'a Tilemap<u16>,
    config: AdaptiveConfig,
}

impl<'a> AdaptiveCellBuilder<'a> {
    pub fn new(palette: &'a Tilemap<u16>, config: AdaptiveConfig) -> Self {
        Self { palette, config }
    }

    /// Boyer-Moore majority vote followed by a validation pass.
    fn survey(&self, n: Node) -> Survey {
        let mut candidate = *self.palette.get(n.x, n.y);
        let mut count = 1usize;
        for y in n.y..n.y + n.h {
            for x in n.x..n.x + n.w {
                if x == n.x && y == n.y {
                    continue;
                }
                let p = *self.palette.get(x, y);
                if p == candidate {
                    count += 1;
                } else {
                    count -= 1;
                    if count == 0 {
                        candidate = p;
                        count = 1;
                    }
                }
            }
        }

        let mut occurrences = 0usize;
        let mut has_deep = false;
        let mut has_shallow = false;
        for y in n.y..n.y + n.h {
            for x in n.x..n.x + n.w {
                let p = *self.palette.get(x, y);
                has_deep |= p == PALETTE_DEEP_WATER;
                has_shallow |= p == PALETTE_SHALLOW_WATER;
                if p == candidate {
                    occurrences += 1;
                }
            }
        }

        Survey {
            candidate,
            fraction: occurrences as f32 / (n.w * n.h) as f32,
            water_mix: has_deep && has_shallow,
        }
    }

    /// Subdivide the raster into leaf rectangles in raster cells.
    pub fn build_rects(&self) -> (Vec<GridRect>, AdaptiveStats) {
        let mut rects = Vec::new();
        let mut stats = AdaptiveStats::default();
        if self.palette.width == 0 || self.palette.height == 0 {
            return (rects, stats);
        }

        let mut stack = vec![Node {
            x: 0,
            y: 0,
            w: self.palette.width,
            h: self.palette.height,
        }];

        while let Some(n) = stack.pop() {
            if rects.len() >= self.config.max_cells {
                stats.truncated = true;
                break;
            }

            let survey = self.survey(n);
            let area = n.w * n.h;
            let majority = survey.fraction >= self.config.majority_threshold || n.w == 1 || n.h == 1;
            let forced = survey.water_mix && area > WATER_MIX_MIN_AREA;

            if majority && !forced {
                rects.push(GridRect {
                    x: n.x,
                    y: n.y,
                    w: n.w,
                    h: n.h,
                    palette_index: survey.candidate,
                });
                continue;
            }

            stats.splits += 1;
            if majority {
                stats.forced_water_splits += 1;
            }
            // Second half pushed first so the first half is processed next.
            if n.w >= n.h {
                let w1 = (n.w / 2).max(1);
                let w2 = n.w - w1;
                stack.push(Node { x: n.x + w1, y: n.y, w: w2, h: n.h });
                stack.push(Node { x: n.x, y: n.y, w: w1, h: n.h });
            } else {
                let h1 = (n.h / 2).max(1);
                let h2 = n.h - h1;
                stack.push(Node { x: n.x, y: n.y + h1, w: n.w, h: h2 });
                stack.push(Node { x: n.x, y: n.y, w: n.w, h: h1 });
            }
        }

        stats.cells = rects.len();
        (rects, stats)
    }

    /// Subdivide and convert leaves to world-space rectangles. One raster
    /// cell spans `world / dim` units. `mean_height` is left at 0; see
    /// [`fill_mean_heights`].
    pub fn build(&self, world_max_x: f32, world_max_y: f32) -> (Vec<AdaptiveCell>, AdaptiveStats) {
        let (rects, stats) = self.build_rects();
        let cell_w = cell_size(world_max_x, self.palette.width);
        let cell_h = cell_size(world_max_y, self.palette.height);

        let cells = rects
            .into_iter()
            .map(|r| AdaptiveCell {
                x: r.x as f32 * cell_w,
                y: r.y as f32 * cell_h,
                w: r.w as f32 * cell_w,
                h: r.h as f32 * cell_h,
                palette_index: r.palette_index,
                mean_height: 0.0,
            })
            .collect();
        (cells, stats)
    }
}

fn cell_size(world: f32, dim: usize) -> f32 {
    if world > 0.0 && dim > 0 {
        world / dim as f32
    } else {
        1.0
    }
}

/// Palette derived from the country raster, for maps without polygon
/// geometry: unclaimed stays 0, country `id` becomes `id + 2`.
pub fn fallback_palette(countries: &Tilemap<u16>) -> Tilemap<u16> {
    let mut palette = Tilemap::new_with(countries.width, countries.height, PALETTE_DEEP_WATER);
    for (x, y, &c) in countries.iter() {
        if c != NO_COUNTRY {
            palette.set(x, y, c.saturating_add(PALETTE_BIOME_OFFSET));
        }
    }
    palette
}

/// Set each cell's `mean_height` to the mean of the heights whose indices
/// fall in its world footprint. The index range is inclusive and clamped to
/// the grid.
pub fn fill_mean_heights(cells: &mut [AdaptiveCell], heights: &Tilemap<f32>, world_max_x: f32, world_max_y: f32) {
    if world_max_x <= 0.0 || world_max_y <= 0.0 || heights.is_empty() {
        return;
    }
    let span_x = (heights.width - 1) as f32;
    let span_y = (heights.height - 1) as f32;
    let max_x = (heights.width - 1) as i64;
    let max_y = (heights.height - 1) as i64;

    for cell in cells.iter_mut() {
        let gx0 = ((cell.x / world_max_x * span_x).floor() as i64).clamp(0, max_x);
        let gx1 = (((cell.x + cell.w) / world_max_x * span_x).ceil() as i64).clamp(0, max_x);
        let gy0 = ((cell.y / world_max_y * span_y).floor() as i64).clamp(0, max_y);
        let gy1 = (((cell.y + cell.h) / world_max_y * span_y).ceil() as i64).clamp(0, max_y);

        let mut sum = 0.0f64;
        let mut count = 0usize;
        for gy in gy0..=gy1 {
            for gx in gx0..=gx1 {
                sum += *heights.get(gx as usize, gy as usize) as f64;
                count += 1;
            }
        }
        cell.mean_height = if count > 0 { (sum / count as f64) as f32 } else { 0.0 };
    }
}
