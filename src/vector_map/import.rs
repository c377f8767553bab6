//! Assembly of a [`WorldRasterModel`] from a normalised source document.

use std::collections::HashMap;

use crate::adaptive::{fallback_palette, fill_mean_heights, AdaptiveCellBuilder, AdaptiveConfig};
use crate::naming::{gen_name, place_seed, DEFAULT_CULTURE};
use crate::rasterize::{ClassifiedCell, DenseRaster, PolygonRasterizer};
use crate::scale::MapScale;
use crate::world::{
    palette_for_biome, CountryInfo, GridPoint, HeightStats, Place, Road, WorldRasterModel, NO_COUNTRY,
    PALETTE_BIOME_OFFSET, PALETTE_DEEP_WATER, PALETTE_SHALLOW_WATER,
};

use super::palette::BiomeTable;
use super::schema::SourceDocument;
use super::{ImportConfig, ImportStats, ParseError};

/// Country colour used for ids not set by any state.
const UNSET_COUNTRY_COLOR: u32 = 0x30_30_30;
/// Colour table used when the source has no states at all.
const NO_STATES_COLOR: u32 = 0x10_10_10;
/// Colour for states without a usable colour.
const DEFAULT_STATE_COLOR: u32 = 0x50_50_50;
/// Fraction of the water height range below which water counts as deep.
const SHALLOW_SPLIT: f32 = 0.60;

/// Country ids assigned to source states
struct StateMapping {
    ids: HashMap<i64, u16>,
    colors: Vec<u32>,
    infos: Vec<CountryInfo>,
}

impl StateMapping {
    fn build(doc: &SourceDocument) -> Self {
        let mut ids = HashMap::new();
        let mut colors = Vec::new();
        let mut infos = Vec::new();

        for (next, state) in (1..=u16::MAX).zip(&doc.states) {
            ids.insert(state.id, next);
            if colors.len() <= next as usize {
                colors.resize(next as usize + 1, UNSET_COUNTRY_COLOR);
            }
            colors[next as usize] = state.color.unwrap_or(DEFAULT_STATE_COLOR);
            infos.push(CountryInfo {
                id: next,
                name: state.name.clone(),
                x: 0.0,
                y: 0.0,
            });
        }
        if colors.is_empty() {
            colors.push(NO_STATES_COLOR);
        }

        Self { ids, colors, infos }
    }

    fn country(&self, state: i64) -> Option<u16> {
        if state < 0 {
            return None;
        }
        self.ids.get(&state).copied()
    }
}

/// Per-cell classification shared by every pass
struct CellClass {
    water: bool,
    palette_index: u16,
    country: u16,
}

/// Height at or above which water is shallow. `None` when there is no
/// water or all water sits at one height; every water cell is then deep.
fn shallow_threshold(water_heights: &[f32]) -> Option<f32> {
    let min = water_heights.iter().copied().reduce(f32::min)?;
    let max = water_heights.iter().copied().reduce(f32::max)?;
    if max > min {
        Some(min + (max - min) * SHALLOW_SPLIT)
    } else {
        None
    }
}

fn height_range(heights: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    heights.fold(None, |acc, h| match acc {
        None => Some((h, h)),
        Some((lo, hi)) => Some((lo.min(h), hi.max(h))),
    })
}

/// Build the full model. Fails only on a degenerate map extent.
pub fn assemble(
    doc: &SourceDocument,
    config: &ImportConfig,
    adaptive: &AdaptiveConfig,
    seed: u64,
    stats: &mut ImportStats,
) -> Result<WorldRasterModel, ParseError> {
    stats.source_cells = doc.cells.len();
    stats.malformed_records = doc.malformed_records;
    stats.out_of_range_biomes = doc.out_of_range_biomes;
    stats.biomes_from_parallel_arrays = doc.biomes_from_parallel_arrays;

    let (max_x, max_y) = doc.extent();
    if max_x <= 0.0 || max_y <= 0.0 {
        return Err(ParseError::DegenerateGeometry { max_x, max_y });
    }

    let mut model = WorldRasterModel::new(config.target_width, config.target_height, max_x as f32, max_y as f32);
    model.scale = MapScale::from_world_width(config.world_km_width, max_x as f32);
    tracing::info!(
        target: "world_atlas::import",
        max_x,
        max_y,
        km_per_unit = model.scale.km_per_unit,
        "import.extent"
    );

    // ===== Biomes =====
    let biomes = BiomeTable::build(&doc.biomes, doc.highest_cell_biome());
    stats.biome_count = biomes.len();
    stats.water_biomes = biomes.water_biome_count();
    stats.default_biome_names = biomes.default_names_filled;
    stats.generated_biome_colors = biomes.generated_colors;
    tracing::info!(
        target: "world_atlas::import",
        biomes = biomes.len(),
        water_biomes = stats.water_biomes,
        from_parallel_arrays = doc.biomes_from_parallel_arrays,
        "import.biomes"
    );

    // ===== States =====
    let states = StateMapping::build(doc);
    stats.states_mapped = states.infos.len();
    tracing::info!(target: "world_atlas::import", states = stats.states_mapped, "import.states");

    // ===== Cell classification =====
    let water_heights: Vec<f32> = doc
        .cells
        .iter()
        .filter(|c| c.state < 0 || biomes.is_water(c.biome))
        .map(|c| c.height)
        .collect();
    stats.water_cells = water_heights.len();
    let threshold = shallow_threshold(&water_heights);
    stats.shallow_threshold = threshold;
    if water_heights.is_empty() {
        tracing::warn!(target: "world_atlas::import", "import.no_water_heights");
    } else if threshold.is_none() {
        tracing::debug!(target: "world_atlas::import", "import.flat_water_all_deep");
    }

    let classes: Vec<CellClass> = doc
        .cells
        .iter()
        .map(|c| {
            let water = c.state < 0 || biomes.is_water(c.biome);
            if water {
                let shallow = threshold.is_some_and(|t| c.height >= t);
                CellClass {
                    water,
                    palette_index: if shallow { PALETTE_SHALLOW_WATER } else { PALETTE_DEEP_WATER },
                    country: NO_COUNTRY,
                }
            } else {
                CellClass {
                    water,
                    palette_index: c.biome.and_then(palette_for_biome).unwrap_or(PALETTE_BIOME_OFFSET),
                    country: states.country(c.state).unwrap_or(NO_COUNTRY),
                }
            }
        })
        .collect();

    let water_range = height_range(water_heights.iter().copied());
    let land_range = height_range(doc.cells.iter().zip(&classes).filter(|(_, k)| !k.water).map(|(c, _)| c.height));
    model.height_stats = HeightStats {
        land_min: land_range.map_or(0.0, |r| r.0),
        land_max: land_range.map_or(0.0, |r| r.1),
        water_min: water_range.map_or(0.0, |r| r.0),
        water_max: water_range.map_or(0.0, |r| r.1),
    };

    // ===== Polygons =====
    let mut raster = DenseRaster::new(model.width, model.height);
    let vertices: &[[f32; 2]] = doc.vertices.as_deref().unwrap_or(&[]);
    stats.raw_vertices = vertices.len();
    if doc.vertices.is_none() {
        tracing::warn!(target: "world_atlas::import", "import.no_vertices");
    }

    if !vertices.is_empty() {
        let mut shapes = Vec::new();
        for (cell, class) in doc.cells.iter().zip(&classes) {
            let Some(refs) = &cell.vertices else {
                continue;
            };
            let vertex_ids: Vec<usize> = refs
                .iter()
                .filter_map(|&id| usize::try_from(id).ok().filter(|&i| i < vertices.len()))
                .collect();
            stats.invalid_vertex_refs += cell.invalid_vertex_refs + refs.len() - vertex_ids.len();
            shapes.push(ClassifiedCell {
                vertex_ids,
                palette_index: class.palette_index,
                country: class.country,
            });
        }

        let rasterizer = PolygonRasterizer::new(model.grid_transform());
        let (buffer, raster_stats) = rasterizer.rasterize(vertices, &shapes, &mut raster);
        tracing::info!(
            target: "world_atlas::import",
            cells = raster_stats.polygon_cells,
            triangles = raster_stats.triangles,
            degenerate = raster_stats.degenerate_triangles,
            scanline_pixels = raster_stats.scanline_pixels,
            "import.polygons"
        );
        model.polygons = buffer;
        stats.raster = raster_stats;
    }
    model.palette_indices = raster.palette;
    model.countries = raster.countries;

    // ===== Centroids =====
    for (cell, class) in doc.cells.iter().zip(&classes) {
        let Some((gx, gy)) = model.world_to_raster(cell.x, cell.y) else {
            stats.skipped_cells += 1;
            continue;
        };
        let tile = cell.biome.and_then(|b| u16::try_from(b).ok()).unwrap_or(0);
        model.tiles.set(gx, gy, tile);
        model.tile_heights.set(gx, gy, cell.height);
        if class.country != NO_COUNTRY && *model.countries.get(gx, gy) == NO_COUNTRY {
            model.countries.set(gx, gy, class.country);
            stats.centroid_countries += 1;
        }
        stats.placed_cells += 1;
    }
    tracing::info!(
        target: "world_atlas::import",
        placed = stats.placed_cells,
        skipped = stats.skipped_cells,
        "import.cells"
    );

    // ===== Burgs =====
    for burg in &doc.burgs {
        let Some((gx, gy)) = model.world_to_raster(burg.x, burg.y) else {
            stats.burgs_discarded += 1;
            continue;
        };
        if (gx, gy) == (0, 0) || *model.countries.get(gx, gy) == NO_COUNTRY {
            stats.burgs_discarded += 1;
            continue;
        }
        let name = if config.keep_source_names && !burg.name.is_empty() {
            burg.name.clone()
        } else {
            gen_name(place_seed(seed, gx, gy), DEFAULT_CULTURE)
        };
        model.places.push(Place {
            name,
            kind: "city".to_string(),
            x: gx,
            y: gy,
        });
        stats.burgs_placed += 1;
    }

    // ===== Roads =====
    for source in &doc.roads {
        let points: Vec<GridPoint> = source
            .points
            .iter()
            .filter_map(|&(x, y)| model.world_to_raster(x, y))
            .map(|(x, y)| GridPoint { x, y })
            .collect();
        stats.road_points_dropped += source.points.len() - points.len();
        if points.is_empty() {
            stats.roads_dropped += 1;
            continue;
        }
        model.roads.push(Road { points });
        stats.roads_imported += 1;
    }
    tracing::info!(
        target: "world_atlas::import",
        burgs = stats.burgs_placed,
        roads = stats.roads_imported,
        "import.places"
    );

    // ===== Adaptive cells =====
    let adaptive_palette = if model.polygons.is_empty() {
        stats.fallback_palette = true;
        fallback_palette(&model.countries)
    } else {
        model.palette_indices.clone()
    };
    let (mut cells, adaptive_stats) =
        AdaptiveCellBuilder::new(&adaptive_palette, adaptive.clone()).build(model.world_max_x, model.world_max_y);
    fill_mean_heights(&mut cells, &model.tile_heights, model.world_max_x, model.world_max_y);
    if adaptive_stats.truncated {
        tracing::warn!(target: "world_atlas::import", cap = adaptive.max_cells, "import.adaptive_cap_reached");
    }
    tracing::info!(
        target: "world_atlas::import",
        cells = adaptive_stats.cells,
        threshold = adaptive.majority_threshold,
        "import.adaptive"
    );
    model.adaptive_cells = cells;
    stats.adaptive = adaptive_stats;

    // ===== Country centroids =====
    let mut sums = vec![(0.0f64, 0.0f64, 0usize); states.colors.len()];
    for cell in &doc.cells {
        if let Some(id) = states.country(cell.state) {
            let acc = &mut sums[id as usize];
            acc.0 += cell.x;
            acc.1 += cell.y;
            acc.2 += 1;
        }
    }
    let mut infos = states.infos;
    for info in infos.iter_mut() {
        let (sx, sy, n) = sums[info.id as usize];
        if n > 0 {
            info.x = (sx / n as f64) as f32;
            info.y = (sy / n as f64) as f32;
        }
    }

    model.country_infos = infos;
    model.country_colors_rgb = states.colors;
    model.biome_seeds = vec![0; biomes.len()];
    model.biome_names = biomes.names;
    model.biome_colors_rgb = biomes.colors;

    Ok(model)
}
