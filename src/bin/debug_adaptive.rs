//! Debug tool for adaptive cell subdivision
//! Classifies synthetic terrain into water and land bands, then reports how
//! many adaptive cells each majority threshold produces.
//!
//! Usage: debug_adaptive [output_prefix]

use world_atlas::adaptive::{fill_mean_heights, AdaptiveCellBuilder, AdaptiveConfig};
use world_atlas::export;
use world_atlas::terrain::{self, NoiseConfig};
use world_atlas::tilemap::Tilemap;
use world_atlas::world::{WorldRasterModel, PALETTE_BIOME_OFFSET, PALETTE_DEEP_WATER, PALETTE_SHALLOW_WATER};

const WIDTH: usize = 512;
const HEIGHT: usize = 256;
const SEED: u64 = 42;
const WORLD_X: f32 = 2000.0;
const WORLD_Y: f32 = 1000.0;

/// Distance below sea level that still counts as shallow water
const SHALLOW_BAND: f32 = 0.05;
/// Number of land palette bands
const LAND_BANDS: u16 = 4;

const THRESHOLDS: [f32; 5] = [0.8, 0.9, 0.95, 0.99, 1.0];

fn classify(field: &Tilemap<f32>, sea_level: f32) -> Tilemap<u16> {
    let mut palette = Tilemap::new_with(field.width, field.height, PALETTE_DEEP_WATER);
    let land_span = (1.0 - sea_level).max(f32::EPSILON);
    for (x, y, &v) in field.iter() {
        let p = if v <= sea_level - SHALLOW_BAND {
            PALETTE_DEEP_WATER
        } else if v <= sea_level {
            PALETTE_SHALLOW_WATER
        } else {
            let t = ((v - sea_level) / land_span).clamp(0.0, 0.999);
            PALETTE_BIOME_OFFSET + (t * LAND_BANDS as f32) as u16
        };
        palette.set(x, y, p);
    }
    palette
}

fn main() {
    println!("Generating adaptive cell comparison...");
    let output_prefix = std::env::args().nth(1);

    let config = NoiseConfig::default();
    let field = terrain::synthesize_field(WIDTH, HEIGHT, WORLD_X, WORLD_Y, SEED, &config);
    let palette = classify(&field, config.sea_level);

    let mut counts = [0usize; 6];
    for (_, _, &p) in palette.iter() {
        counts[(p as usize).min(5)] += 1;
    }
    println!(
        "Palette bands: {} deep, {} shallow, land {:?}",
        counts[0],
        counts[1],
        &counts[2..]
    );

    let mut model = WorldRasterModel::synthetic(WIDTH, HEIGHT, WORLD_X, WORLD_Y);
    terrain::generate_into(&mut model, SEED, &config);
    model.palette_indices = palette;

    let total = WIDTH * HEIGHT;
    println!("{:>10} {:>10} {:>10} {:>12} {:>10}", "threshold", "cells", "splits", "water_split", "ratio");
    for threshold in THRESHOLDS {
        let adaptive = AdaptiveConfig {
            majority_threshold: threshold,
            ..AdaptiveConfig::default()
        };
        let builder = AdaptiveCellBuilder::new(&model.palette_indices, adaptive);
        let (mut cells, stats) = builder.build(WORLD_X, WORLD_Y);
        println!(
            "{:>10.2} {:>10} {:>10} {:>12} {:>9.1}x{}",
            threshold,
            stats.cells,
            stats.splits,
            stats.forced_water_splits,
            total as f64 / stats.cells.max(1) as f64,
            if stats.truncated { " (cap)" } else { "" }
        );

        if let Some(prefix) = &output_prefix {
            fill_mean_heights(&mut cells, &model.tile_heights, WORLD_X, WORLD_Y);
            model.adaptive_cells = cells;
            let path = format!("{}_adaptive_{:03}.png", prefix, (threshold * 100.0).round() as u32);
            match export::render_adaptive(&model).save(&path) {
                Ok(()) => println!("  saved {}", path),
                Err(e) => eprintln!("  failed to save {}: {}", path, e),
            }
        }
    }

    if let Some(prefix) = &output_prefix {
        let path = format!("{}_bands.png", prefix);
        match export::render_palette(&model).save(&path) {
            Ok(()) => println!("Saved {}", path),
            Err(e) => eprintln!("Failed to save {}: {}", path, e),
        }
    }
}
