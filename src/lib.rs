//! World atlas library
//!
//! Builds a uniform world raster either by importing a fantasy-map vector
//! export or by synthesising terrain from noise. Re-exports modules for use
//! by binaries and tools.

pub mod adaptive;
pub mod biome_heights;
pub mod config;
pub mod export;
pub mod hashing;
pub mod naming;
pub mod noise_field;
pub mod rasterize;
pub mod scale;
pub mod terrain;
pub mod tilemap;
pub mod vector_map;
pub mod world;

pub use adaptive::{AdaptiveCellBuilder, AdaptiveConfig, AdaptiveStats};
pub use config::{ConfigError, PipelineConfig};
pub use rasterize::{PolygonRasterizer, RasterStats};
pub use terrain::{NoiseConfig, TerrainStats};
pub use vector_map::{ImportConfig, ImportStats, ParseError, VectorMapParser};
pub use world::WorldRasterModel;
