//! Vector map import
//!
//! Turns a fantasy-map JSON export (cells, states, biomes, burgs, roads and
//! the shared vertex list) into a [`WorldRasterModel`]:
//! - **repair**: lossless neutralisation of unpaired surrogate escapes
//! - **schema**: root/`pack` and `biomes`/`biomesData` normalisation
//! - **palette**: biome names, colours and water detection
//! - **import**: classification, rasterization, places, roads and adaptive cells
//!
//! Only an unreadable file, unparseable JSON and a zero map extent are
//! fatal. Everything else is skipped and counted in [`ImportStats`].

pub mod import;
pub mod palette;
pub mod repair;
pub mod schema;

pub use palette::BiomeTable;
pub use repair::{repair_surrogates, SurrogateStats};
pub use schema::{normalise, SourceDocument};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adaptive::{AdaptiveConfig, AdaptiveStats};
use crate::rasterize::RasterStats;
use crate::scale::DEFAULT_WORLD_KM_WIDTH;
use crate::world::WorldRasterModel;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read map file {path:?}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse map document: {0}")]
    SchemaInvalid(#[from] serde_json::Error),
    #[error("degenerate map extent max_x={max_x} max_y={max_y}")]
    DegenerateGeometry { max_x: f64, max_y: f64 },
}

/// Parameters for importing a vector map
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Raster width in cells
    pub target_width: usize,
    /// Raster height in cells
    pub target_height: usize,
    /// Keep settlement names from the source instead of generating them
    pub keep_source_names: bool,
    /// Real-world width of the whole map in kilometres
    pub world_km_width: f32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            target_width: 2000,
            target_height: 2000,
            keep_source_names: true,
            world_km_width: DEFAULT_WORLD_KM_WIDTH,
        }
    }
}

/// Diagnostics from one import
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportStats {
    pub file_bytes: usize,
    pub surrogates: SurrogateStats,
    pub source_cells: usize,
    /// Non-object records in the source arrays
    pub malformed_records: usize,
    /// Biome ids with no palette index, treated as unknown
    pub out_of_range_biomes: usize,
    pub biome_count: usize,
    pub water_biomes: usize,
    pub biomes_from_parallel_arrays: bool,
    pub default_biome_names: usize,
    pub generated_biome_colors: usize,
    pub water_cells: usize,
    /// Water height at or above which water is shallow
    pub shallow_threshold: Option<f32>,
    pub states_mapped: usize,
    pub raw_vertices: usize,
    pub invalid_vertex_refs: usize,
    pub raster: RasterStats,
    /// Cells whose centroid landed on the raster
    pub placed_cells: usize,
    /// Cells whose centroid fell outside the raster
    pub skipped_cells: usize,
    /// Country pixels claimed by the centroid pass
    pub centroid_countries: usize,
    pub burgs_placed: usize,
    pub burgs_discarded: usize,
    pub roads_imported: usize,
    pub roads_dropped: usize,
    pub road_points_dropped: usize,
    pub adaptive: AdaptiveStats,
    /// Adaptive cells were built from the country raster (no polygons)
    pub fallback_palette: bool,
}

/// Importer for vector map exports
#[derive(Clone, Debug, Default)]
pub struct VectorMapParser {
    pub config: ImportConfig,
    pub adaptive: AdaptiveConfig,
    /// Seed for generated settlement names
    pub seed: u64,
}

impl VectorMapParser {
    pub fn new(config: ImportConfig, adaptive: AdaptiveConfig, seed: u64) -> Self {
        Self { config, adaptive, seed }
    }

    /// Repair, parse and import a raw document.
    pub fn parse(&self, raw: &[u8]) -> Result<(WorldRasterModel, ImportStats), ParseError> {
        let mut stats = ImportStats {
            file_bytes: raw.len(),
            ..ImportStats::default()
        };

        let (prepared, surrogates) = repair_surrogates(raw);
        stats.surrogates = surrogates;
        if surrogates.repaired() > 0 {
            tracing::warn!(
                target: "world_atlas::import",
                isolated_high = surrogates.isolated_high,
                isolated_low = surrogates.isolated_low,
                preserved_pairs = surrogates.preserved_pairs,
                "import.surrogates_neutralised"
            );
        }

        let root: serde_json::Value = serde_json::from_slice(&prepared)?;
        let doc = normalise(&root);
        tracing::info!(
            target: "world_atlas::import",
            root_keys = doc.root_keys,
            cells = doc.cells.len(),
            malformed = doc.malformed_records,
            "import.document"
        );

        let model = import::assemble(&doc, &self.config, &self.adaptive, self.seed, &mut stats)?;
        tracing::info!(
            target: "world_atlas::import",
            width = model.width,
            height = model.height,
            places = model.places.len(),
            roads = model.roads.len(),
            countries = model.country_infos.len(),
            "import.complete"
        );
        Ok((model, stats))
    }

    /// Read a file from disk and import it.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(WorldRasterModel, ImportStats), ParseError> {
        let path = path.as_ref();
        tracing::info!(target: "world_atlas::import", path = %path.display(), "import.open");
        let raw = fs::read(path).map_err(|source| ParseError::IoFailure {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&raw)
    }
}
