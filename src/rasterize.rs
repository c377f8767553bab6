//! Polygon rasterization onto the dense world grid.
//!
//! Two passes over the source cells:
//! - fan triangulation + point-in-triangle coverage, writing palette indices
//!   and (first-writer-wins) country ids
//! - scanline fill of each land cell's outline, writing country ids only
//!
//! Fan triangulation from vertex 0 is exact for convex and star-shaped cells
//! and approximate for other concave cells. The scanline pass follows the
//! real outline, so country boundaries do not depend on the fan.

use crate::tilemap::Tilemap;
use crate::world::{CellPoly, GridTransform, PolyVertex, PolygonBuffer, NO_COUNTRY};

/// A source cell ready for rasterization.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedCell {
    /// Ordered indices into the raw vertex list
    pub vertex_ids: Vec<usize>,
    pub palette_index: u16,
    /// Country id, `NO_COUNTRY` for water and unclaimed land
    pub country: u16,
}

/// Dense per-pixel classification produced by the rasterizer.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseRaster {
    pub palette: Tilemap<u16>,
    pub countries: Tilemap<u16>,
}

impl DenseRaster {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            palette: Tilemap::new_with(width, height, 0),
            countries: Tilemap::new_with(width, height, NO_COUNTRY),
        }
    }
}

/// Counters for one rasterization run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RasterStats {
    /// Cells with at least three valid vertices
    pub polygon_cells: usize,
    pub triangles: usize,
    pub degenerate_triangles: usize,
    pub palette_pixels: usize,
    /// Country pixels claimed by the triangle pass
    pub triangle_country_pixels: usize,
    /// Country pixels claimed by the scanline pass
    pub scanline_pixels: usize,
}

/// Triangles `(v0, vi, vi+1)` for `i = 1..n-2`. Empty for fewer than three
/// vertices.
pub fn fan_triangulate(vertex_count: usize) -> Vec<[usize; 3]> {
    if vertex_count < 3 {
        return Vec::new();
    }
    (1..vertex_count - 1).map(|i| [0, i, i + 1]).collect()
}

/// Signed edge function of `p` against the directed edge `a -> b`.
#[inline]
pub fn edge_function(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (p[0] - a[0]) * (b[1] - a[1]) - (p[1] - a[1]) * (b[0] - a[0])
}

/// Inclusive pixel range covering `[lo, hi]`, clamped to `[0, size)`.
fn clamped_span(lo: f32, hi: f32, size: usize) -> Option<(usize, usize)> {
    if size == 0 {
        return None;
    }
    let start = lo.floor().max(0.0);
    let end = hi.ceil().min((size - 1) as f32);
    if !(start <= end) {
        return None;
    }
    Some((start as usize, end as usize))
}

/// Rasterize one triangle given in grid coordinates. A pixel is inside when
/// its centre has sign-consistent edge functions matching the winding.
/// Palette is always written; the country only into unclaimed pixels.
/// Returns `None` for zero-area triangles, otherwise
/// `(covered pixels, newly claimed country pixels)`.
pub fn rasterize_triangle(
    raster: &mut DenseRaster,
    tri: [[f32; 2]; 3],
    palette_index: u16,
    country: u16,
) -> Option<(usize, usize)> {
    let [g0, g1, g2] = tri;
    let area = edge_function(g0, g1, g2);
    if area == 0.0 || !area.is_finite() {
        return None;
    }

    let min_x = g0[0].min(g1[0]).min(g2[0]);
    let max_x = g0[0].max(g1[0]).max(g2[0]);
    let min_y = g0[1].min(g1[1]).min(g2[1]);
    let max_y = g0[1].max(g1[1]).max(g2[1]);

    let width = raster.palette.width;
    let height = raster.palette.height;
    let (Some((x0, x1)), Some((y0, y1))) = (
        clamped_span(min_x, max_x, width),
        clamped_span(min_y, max_y, height),
    ) else {
        return Some((0, 0));
    };

    let mut covered = 0;
    let mut claimed = 0;
    for gy in y0..=y1 {
        for gx in x0..=x1 {
            let p = [gx as f32 + 0.5, gy as f32 + 0.5];
            let e0 = edge_function(g0, g1, p);
            let e1 = edge_function(g1, g2, p);
            let e2 = edge_function(g2, g0, p);
            let inside = if area > 0.0 {
                e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0
            } else {
                e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0
            };
            if !inside {
                continue;
            }

            raster.palette.set(gx, gy, palette_index);
            covered += 1;
            if country != NO_COUNTRY && *raster.countries.get(gx, gy) == NO_COUNTRY {
                raster.countries.set(gx, gy, country);
                claimed += 1;
            }
        }
    }
    Some((covered, claimed))
}

/// Sorted x intersections of the horizontal line `scan_y` with a closed
/// polygon. Horizontal edges are ignored and each edge covers the half-open
/// interval `[min_y, max_y)` so shared vertices are counted once.
pub fn scanline_intersections(polygon: &[[f32; 2]], scan_y: f32) -> Vec<f32> {
    let mut xs = Vec::new();
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        if a[1] == b[1] {
            continue;
        }
        if scan_y < a[1].min(b[1]) || scan_y >= a[1].max(b[1]) {
            continue;
        }
        let t = (scan_y - a[1]) / (b[1] - a[1]);
        xs.push(a[0] + (b[0] - a[0]) * t);
    }
    xs.sort_by(f32::total_cmp);
    xs
}

/// Fill the interior of a polygon (grid coordinates) with `country`, only
/// into unclaimed pixels. Returns the number of pixels claimed.
pub fn scanline_fill_country(countries: &mut Tilemap<u16>, polygon: &[[f32; 2]], country: u16) -> usize {
    if polygon.len() < 3 || country == NO_COUNTRY {
        return 0;
    }

    let min_y = polygon.iter().map(|p| p[1]).fold(f32::MAX, f32::min);
    let max_y = polygon.iter().map(|p| p[1]).fold(f32::MIN, f32::max);
    let Some((y0, y1)) = clamped_span(min_y, max_y, countries.height) else {
        return 0;
    };
    if countries.width == 0 {
        return 0;
    }
    let last_x = (countries.width - 1) as f32;

    let mut filled = 0;
    for y in y0..=y1 {
        let xs = scanline_intersections(polygon, y as f32 + 0.5);
        for pair in xs.chunks_exact(2) {
            let (lo, hi) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
            let start = lo.ceil().max(0.0);
            let end = hi.floor().min(last_x);
            if !(start <= end) {
                continue;
            }
            for x in start as usize..=end as usize {
                if *countries.get(x, y) == NO_COUNTRY {
                    countries.set(x, y, country);
                    filled += 1;
                }
            }
        }
    }
    filled
}

/// Converts classified source cells into polygon buffers and dense rasters.
#[derive(Clone, Copy, Debug)]
pub struct PolygonRasterizer {
    transform: GridTransform,
}

impl PolygonRasterizer {
    pub fn new(transform: GridTransform) -> Self {
        Self { transform }
    }

    /// Fan-triangulate every cell with at least three valid vertices into a
    /// world-space triangle buffer, preserving cell order.
    pub fn build_fans(&self, vertices: &[[f32; 2]], cells: &[ClassifiedCell]) -> PolygonBuffer {
        let mut buffer = PolygonBuffer::default();

        for cell in cells {
            let ring: Vec<[f32; 2]> = cell
                .vertex_ids
                .iter()
                .filter_map(|&id| vertices.get(id).copied())
                .collect();
            let fans = fan_triangulate(ring.len());
            if fans.is_empty() {
                continue;
            }

            let first_vertex = buffer.vertices.len() as u32;
            for [a, b, c] in fans {
                for idx in [a, b, c] {
                    buffer.vertices.push(PolyVertex {
                        x: ring[idx][0],
                        y: ring[idx][1],
                        palette_index: cell.palette_index,
                    });
                }
                buffer.triangle_countries.push(cell.country);
            }
            buffer.cells.push(CellPoly {
                first_vertex,
                vertex_count: buffer.vertices.len() as u32 - first_vertex,
                palette_index: cell.palette_index,
                country: cell.country,
            });
        }

        buffer
    }

    /// Scanline pass over every cell that carries a country.
    pub fn fill_countries(
        &self,
        vertices: &[[f32; 2]],
        cells: &[ClassifiedCell],
        countries: &mut Tilemap<u16>,
    ) -> usize {
        let mut filled = 0;
        for cell in cells.iter().filter(|c| c.country != NO_COUNTRY) {
            let outline: Vec<[f32; 2]> = cell
                .vertex_ids
                .iter()
                .filter_map(|&id| vertices.get(id))
                .map(|v| {
                    let (gx, gy) = self.transform.apply(v[0], v[1]);
                    [gx, gy]
                })
                .collect();
            filled += scanline_fill_country(countries, &outline, cell.country);
        }
        filled
    }

    /// Point-in-triangle pass over a triangle buffer, in buffer order.
    pub fn rasterize_triangles(&self, buffer: &PolygonBuffer, raster: &mut DenseRaster) -> RasterStats {
        let mut stats = RasterStats::default();

        for (tri, country) in buffer.triangles() {
            stats.triangles += 1;
            let grid = tri.map(|v| {
                let (gx, gy) = self.transform.apply(v.x, v.y);
                [gx, gy]
            });
            match rasterize_triangle(raster, grid, tri[0].palette_index, country) {
                Some((covered, claimed)) => {
                    stats.palette_pixels += covered;
                    stats.triangle_country_pixels += claimed;
                }
                None => stats.degenerate_triangles += 1,
            }
        }

        stats
    }

    /// Full pass: build fans, scanline-fill countries, then rasterize
    /// triangles into `raster`.
    pub fn rasterize(
        &self,
        vertices: &[[f32; 2]],
        cells: &[ClassifiedCell],
        raster: &mut DenseRaster,
    ) -> (PolygonBuffer, RasterStats) {
        let buffer = self.build_fans(vertices, cells);
        let scanline_pixels = self.fill_countries(vertices, cells, &mut raster.countries);
        let mut stats = self.rasterize_triangles(&buffer, raster);
        stats.polygon_cells = buffer.cells.len();
        stats.scanline_pixels = scanline_pixels;
        (buffer, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> PolygonRasterizer {
        PolygonRasterizer::new(GridTransform { sx: 1.0, sy: 1.0 })
    }

    #[test]
    fn test_fan_triangulation() {
        assert!(fan_triangulate(2).is_empty());
        assert_eq!(fan_triangulate(3), vec![[0, 1, 2]]);
        assert_eq!(fan_triangulate(5), vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
    }

    #[test]
    fn test_triangle_containment() {
        let mut raster = DenseRaster::new(16, 16);
        let tri = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];
        let result = rasterize_triangle(&mut raster, tri, 5, 0);
        assert!(result.is_some());
        assert_eq!(*raster.palette.get(1, 1), 5, "cell (1,1) is inside");
        assert_eq!(*raster.palette.get(9, 9), 0, "cell (9,9) is outside");
    }

    #[test]
    fn test_winding_does_not_matter() {
        let mut cw = DenseRaster::new(16, 16);
        let mut ccw = DenseRaster::new(16, 16);
        rasterize_triangle(&mut cw, [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]], 3, 0);
        rasterize_triangle(&mut ccw, [[0.0, 0.0], [0.0, 10.0], [10.0, 0.0]], 3, 0);
        assert_eq!(cw, ccw);
    }

    #[test]
    fn test_degenerate_triangle_skipped() {
        let mut raster = DenseRaster::new(8, 8);
        let result = rasterize_triangle(&mut raster, [[0.0, 0.0], [4.0, 4.0], [8.0, 8.0]], 7, 2);
        assert_eq!(result, None);
        assert!(raster.palette.as_slice().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_offscreen_triangle_is_clamped() {
        let mut raster = DenseRaster::new(4, 4);
        let result = rasterize_triangle(&mut raster, [[-20.0, -20.0], [-10.0, -20.0], [-20.0, -10.0]], 7, 2);
        assert_eq!(result, Some((0, 0)));
    }

    #[test]
    fn test_country_first_writer_wins() {
        let mut raster = DenseRaster::new(12, 12);
        let square = |palette, country, raster: &mut DenseRaster| {
            rasterize_triangle(raster, [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]], palette, country);
            rasterize_triangle(raster, [[0.0, 0.0], [10.0, 10.0], [0.0, 10.0]], palette, country);
        };
        square(4, 1, &mut raster);
        square(6, 2, &mut raster);

        assert_eq!(*raster.countries.get(5, 5), 1, "second cell must not overwrite");
        assert_eq!(*raster.palette.get(5, 5), 6, "palette follows the last writer");
    }

    #[test]
    fn test_buffer_order_decides_shared_pixels() {
        let rasterizer = identity();
        let vertices = vec![[0.0, 0.0], [8.0, 0.0], [8.0, 8.0], [0.0, 8.0], [16.0, 0.0], [16.0, 8.0]];
        let left = ClassifiedCell { vertex_ids: vec![0, 1, 2, 3], palette_index: 3, country: 1 };
        let right = ClassifiedCell { vertex_ids: vec![1, 4, 5, 2], palette_index: 4, country: 2 };

        let buffer = rasterizer.build_fans(&vertices, &[left.clone(), right.clone()]);
        let mut raster = DenseRaster::new(20, 10);
        rasterizer.rasterize_triangles(&buffer, &mut raster);
        // Column 8 has centres at x=8.5, inside only the right cell.
        assert_eq!(*raster.countries.get(8, 4), 2);
        // Column 7 (centre 7.5) belongs to the left cell.
        assert_eq!(*raster.countries.get(7, 4), 1);

        let buffer = rasterizer.build_fans(&vertices, &[right, left]);
        assert_eq!(buffer.triangle_countries, vec![2, 2, 1, 1]);
    }

    #[test]
    fn test_build_fans_skips_short_and_invalid() {
        let rasterizer = identity();
        let vertices = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
        let cells = vec![
            ClassifiedCell { vertex_ids: vec![0, 1], palette_index: 2, country: 0 },
            ClassifiedCell { vertex_ids: vec![0, 1, 99], palette_index: 2, country: 0 },
            ClassifiedCell { vertex_ids: vec![0, 1, 2], palette_index: 9, country: 3 },
        ];
        let buffer = rasterizer.build_fans(&vertices, &cells);
        assert_eq!(buffer.cells.len(), 1);
        assert_eq!(buffer.triangle_count(), 1);
        assert_eq!(buffer.cells[0].vertex_count, 3);
        assert_eq!(buffer.cells[0].country, 3);
        assert!(buffer.vertices.iter().all(|v| v.palette_index == 9));
    }

    #[test]
    fn test_scanline_fills_square() {
        let mut countries = Tilemap::new_with(10, 10, NO_COUNTRY);
        let square = [[1.0, 1.0], [6.0, 1.0], [6.0, 6.0], [1.0, 6.0]];
        let filled = scanline_fill_country(&mut countries, &square, 3);
        // Rows 1..=5 (centres 1.5..5.5), columns 1..=6.
        assert_eq!(filled, 5 * 6);
        assert_eq!(*countries.get(1, 1), 3);
        assert_eq!(*countries.get(6, 5), 3);
        assert_eq!(*countries.get(0, 3), NO_COUNTRY);
        assert_eq!(*countries.get(3, 6), NO_COUNTRY);
    }

    #[test]
    fn test_scanline_handles_concave_outline() {
        // L shape: the notch at top-right must stay empty.
        let mut countries = Tilemap::new_with(10, 10, NO_COUNTRY);
        let l_shape = [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [8.0, 4.0], [8.0, 8.0], [0.0, 8.0]];
        scanline_fill_country(&mut countries, &l_shape, 1);
        assert_eq!(*countries.get(2, 2), 1);
        assert_eq!(*countries.get(6, 2), NO_COUNTRY);
        assert_eq!(*countries.get(6, 6), 1);
    }

    #[test]
    fn test_scanline_respects_claimed_pixels() {
        let mut countries = Tilemap::new_with(6, 6, NO_COUNTRY);
        countries.set(2, 2, 9);
        let square = [[0.0, 0.0], [5.0, 0.0], [5.0, 5.0], [0.0, 5.0]];
        scanline_fill_country(&mut countries, &square, 4);
        assert_eq!(*countries.get(2, 2), 9);
        assert_eq!(*countries.get(3, 3), 4);
    }

    #[test]
    fn test_shared_vertex_counted_once() {
        // Diamond with vertices exactly on the scan line y = 2.5.
        let diamond = [[2.5, 0.5], [4.5, 2.5], [2.5, 4.5], [0.5, 2.5]];
        let xs = scanline_intersections(&diamond, 2.5);
        assert_eq!(xs.len(), 2);
        assert_eq!(xs, vec![0.5, 4.5]);
    }

    #[test]
    fn test_full_pass_uses_transform() {
        // World extent 20 units onto an 11-pixel grid: scale 0.5.
        let rasterizer = PolygonRasterizer::new(GridTransform::new(11, 11, 20.0, 20.0));
        let vertices = vec![[0.0, 0.0], [20.0, 0.0], [20.0, 20.0], [0.0, 20.0]];
        let cells = vec![ClassifiedCell { vertex_ids: vec![0, 1, 2, 3], palette_index: 5, country: 1 }];
        let mut raster = DenseRaster::new(11, 11);
        let (buffer, stats) = rasterizer.rasterize(&vertices, &cells, &mut raster);

        assert_eq!(buffer.triangle_count(), 2);
        assert_eq!(stats.polygon_cells, 1);
        assert_eq!(stats.triangles, 2);
        assert_eq!(stats.degenerate_triangles, 0);
        assert!(stats.scanline_pixels > 0);
        assert_eq!(*raster.palette.get(5, 5), 5);
        assert_eq!(*raster.countries.get(5, 5), 1);
        // Pixel 10 has its centre at 10.5, beyond the grid edge at 10.
        assert_eq!(*raster.palette.get(10, 10), 0);
    }
}
