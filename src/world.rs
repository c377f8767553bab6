//! World raster model
//!
//! The shared grid that every pipeline stage writes into: palette
//! classification, heights, country ids, the legacy centroid tile raster,
//! the polygon buffers and the adaptive cell list. A model is built once by
//! either the import path or the synthesis path and then treated as an
//! immutable snapshot until a full rebuild replaces it.

use serde::Serialize;

use crate::scale::MapScale;
use crate::tilemap::Tilemap;

/// Palette index for deep water.
pub const PALETTE_DEEP_WATER: u16 = 0;
/// Palette index for shallow water.
pub const PALETTE_SHALLOW_WATER: u16 = 1;
/// Land palette indices are `biome id + PALETTE_BIOME_OFFSET`.
pub const PALETTE_BIOME_OFFSET: u16 = 2;
/// Country id for unclaimed land and water.
pub const NO_COUNTRY: u16 = 0;

/// Canonical biome names, indexed by biome id.
pub const DEFAULT_BIOME_NAMES: [&str; 13] = [
    "Marine",
    "Hot Desert",
    "Cold Desert",
    "Savanna",
    "Grassland",
    "Tropical Seasonal Forest",
    "Temperate Deciduous Forest",
    "Tropical Rainforest",
    "Temperate Rainforest",
    "Taiga",
    "Tundra",
    "Glacier",
    "Wetland",
];

/// Largest biome id that still has a palette index.
pub const MAX_BIOME_ID: usize = (u16::MAX - PALETTE_BIOME_OFFSET) as usize;

/// Palette index of a land cell with the given biome, `None` past
/// [`MAX_BIOME_ID`].
pub fn palette_for_biome(biome_id: usize) -> Option<u16> {
    u16::try_from(biome_id).ok()?.checked_add(PALETTE_BIOME_OFFSET)
}

/// Biome id encoded by a palette index, `None` for water.
pub fn biome_for_palette(palette_index: u16) -> Option<usize> {
    palette_index
        .checked_sub(PALETTE_BIOME_OFFSET)
        .map(|b| b as usize)
}

/// A named settlement in raster coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Place {
    pub name: String,
    pub kind: String,
    pub x: usize,
    pub y: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GridPoint {
    pub x: usize,
    pub y: usize,
}

/// A polyline in raster coordinates.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Road {
    pub points: Vec<GridPoint>,
}

/// Metadata for one discovered country. `x`/`y` is the mean of its cell
/// centroids in source map units.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountryInfo {
    pub id: u16,
    pub name: String,
    pub x: f32,
    pub y: f32,
}

/// One vertex of the fan-triangulated polygon buffer (source map units).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolyVertex {
    pub x: f32,
    pub y: f32,
    pub palette_index: u16,
}

/// A source cell's span of triangles in the polygon buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellPoly {
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub palette_index: u16,
    pub country: u16,
}

/// Flattened triangle list for the source vector geometry. Every three
/// vertices form one triangle; `triangle_countries` runs parallel to the
/// triangles.
#[derive(Clone, Debug, Default)]
pub struct PolygonBuffer {
    pub vertices: Vec<PolyVertex>,
    pub cells: Vec<CellPoly>,
    pub triangle_countries: Vec<u16>,
}

impl PolygonBuffer {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Triangles with the country id each one carries.
    pub fn triangles(&self) -> impl Iterator<Item = ([PolyVertex; 3], u16)> + '_ {
        self.vertices.chunks_exact(3).enumerate().map(move |(t, tri)| {
            let country = self.triangle_countries.get(t).copied().unwrap_or(NO_COUNTRY);
            ([tri[0], tri[1], tri[2]], country)
        })
    }
}

/// A rectangle of the adaptive political/biome overlay, in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AdaptiveCell {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub palette_index: u16,
    pub mean_height: f32,
}

/// Height ranges used downstream for shading normalisation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HeightStats {
    pub land_min: f32,
    pub land_max: f32,
    pub water_min: f32,
    pub water_max: f32,
}

/// Affine map from source units to fractional raster coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridTransform {
    pub sx: f32,
    pub sy: f32,
}

impl GridTransform {
    pub fn new(width: usize, height: usize, world_max_x: f32, world_max_y: f32) -> Self {
        let sx = if width > 1 && world_max_x > 0.0 {
            (width - 1) as f32 / world_max_x
        } else {
            1.0
        };
        let sy = if height > 1 && world_max_y > 0.0 {
            (height - 1) as f32 / world_max_y
        } else {
            1.0
        };
        Self { sx, sy }
    }

    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.sx, y * self.sy)
    }
}

/// The canonical world grid.
#[derive(Clone, Debug)]
pub struct WorldRasterModel {
    pub width: usize,
    pub height: usize,
    /// Continuous extent of the source map
    pub world_max_x: f32,
    pub world_max_y: f32,
    pub scale: MapScale,
    /// 0 deep water, 1 shallow water, >=2 biome id + 2
    pub palette_indices: Tilemap<u16>,
    /// Relative height per raster cell (never negative by construction)
    pub tile_heights: Tilemap<f32>,
    /// Discrete country id per raster cell, 0 = unclaimed/water
    pub countries: Tilemap<u16>,
    /// Biome id written at each source cell centroid
    pub tiles: Tilemap<u16>,
    /// Packed 0xRRGGBB colour per country id, index 0 reserved
    pub country_colors_rgb: Vec<u32>,
    pub country_infos: Vec<CountryInfo>,
    pub biome_names: Vec<String>,
    pub biome_colors_rgb: Vec<u32>,
    /// Per-biome noise seed, 0 = not derived yet
    pub biome_seeds: Vec<u64>,
    pub polygons: PolygonBuffer,
    pub adaptive_cells: Vec<AdaptiveCell>,
    pub places: Vec<Place>,
    pub roads: Vec<Road>,
    pub height_stats: HeightStats,
}

impl WorldRasterModel {
    /// Empty model: all water, unclaimed, flat.
    pub fn new(width: usize, height: usize, world_max_x: f32, world_max_y: f32) -> Self {
        Self {
            width,
            height,
            world_max_x,
            world_max_y,
            scale: MapScale::default(),
            palette_indices: Tilemap::new_with(width, height, PALETTE_DEEP_WATER),
            tile_heights: Tilemap::new_with(width, height, 0.0),
            countries: Tilemap::new_with(width, height, NO_COUNTRY),
            tiles: Tilemap::new_with(width, height, 0),
            country_colors_rgb: Vec::new(),
            country_infos: Vec::new(),
            biome_names: Vec::new(),
            biome_colors_rgb: Vec::new(),
            biome_seeds: Vec::new(),
            polygons: PolygonBuffer::default(),
            adaptive_cells: Vec::new(),
            places: Vec::new(),
            roads: Vec::new(),
            height_stats: HeightStats::default(),
        }
    }

    /// Model for the no-import path: every cell is land of biome 0 and the
    /// biome table holds the canonical names.
    pub fn synthetic(width: usize, height: usize, world_max_x: f32, world_max_y: f32) -> Self {
        let mut model = Self::new(width, height, world_max_x, world_max_y);
        model.palette_indices.fill(PALETTE_BIOME_OFFSET);
        model.biome_names = DEFAULT_BIOME_NAMES.iter().map(|s| s.to_string()).collect();
        model.biome_colors_rgb = vec![0x70_70_70; DEFAULT_BIOME_NAMES.len()];
        model.biome_seeds = vec![0; DEFAULT_BIOME_NAMES.len()];
        model
    }

    /// World coordinates of raster cell `(x, y)`:
    /// `world = index / (dim - 1) * world_max`.
    pub fn raster_to_world(&self, x: usize, y: usize) -> (f32, f32) {
        let wx = if self.width > 1 && self.world_max_x > 0.0 {
            x as f32 / (self.width - 1) as f32 * self.world_max_x
        } else {
            x as f32
        };
        let wy = if self.height > 1 && self.world_max_y > 0.0 {
            y as f32 / (self.height - 1) as f32 * self.world_max_y
        } else {
            y as f32
        };
        (wx, wy)
    }

    /// Raster cell containing world point `(x, y)`, `None` outside the grid.
    pub fn world_to_raster(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if self.world_max_x <= 0.0 || self.world_max_y <= 0.0 {
            return None;
        }
        let gx = (x / self.world_max_x as f64 * (self.width as f64 - 1.0)).floor();
        let gy = (y / self.world_max_y as f64 * (self.height as f64 - 1.0)).floor();
        if gx < 0.0 || gy < 0.0 || gx >= self.width as f64 || gy >= self.height as f64 {
            return None;
        }
        Some((gx as usize, gy as usize))
    }

    pub fn grid_transform(&self) -> GridTransform {
        GridTransform::new(self.width, self.height, self.world_max_x, self.world_max_y)
    }

    pub fn biome_name(&self, biome_id: usize) -> Option<&str> {
        self.biome_names.get(biome_id).map(String::as_str)
    }

    pub fn country_info(&self, id: u16) -> Option<&CountryInfo> {
        self.country_infos.iter().find(|c| c.id == id)
    }

    /// Number of raster cells currently claimed by any country.
    pub fn claimed_cells(&self) -> usize {
        self.countries.as_slice().iter().filter(|&&c| c != NO_COUNTRY).count()
    }

    /// Biome ids that occur in the palette raster, ascending.
    pub fn biomes_present(&self) -> Vec<usize> {
        let mut seen = vec![false; self.biome_names.len()];
        for &p in self.palette_indices.as_slice() {
            if let Some(b) = biome_for_palette(p) {
                if b >= seen.len() {
                    seen.resize(b + 1, false);
                }
                seen[b] = true;
            }
        }
        seen.iter()
            .enumerate()
            .filter_map(|(b, &s)| if s { Some(b) } else { None })
            .collect()
    }
}
