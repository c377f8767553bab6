//! Per-biome height refinement.
//!
//! Each biome gets its own stable noise seed derived from the global seed, its
//! id and its name. Heights of every raster cell classified as that biome are
//! then resampled from a 4-octave lattice noise centred on a per-biome base
//! elevation.

use serde::{Deserialize, Serialize};

use crate::hashing::OCTAVE_STEP;
use crate::noise_field::lattice_value;
use crate::world::{biome_for_palette, WorldRasterModel};

/// Descriptive parameters for procedural generation inside one biome
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeGenConfig {
    /// Expected mean altitude
    pub base_elevation: f32,
    /// Relative spread around the mean
    pub elevation_variance: f32,
    /// Noise frequency
    pub roughness: f32,
    /// Decoration density (0..1)
    pub vegetation_density: f32,
    /// Chance of special features
    pub feature_chance: f32,
}

impl Default for BiomeGenConfig {
    fn default() -> Self {
        Self {
            base_elevation: 0.0,
            elevation_variance: 1.0,
            roughness: 1.0,
            vegetation_density: 0.5,
            feature_chance: 0.1,
        }
    }
}

impl BiomeGenConfig {
    const fn preset(
        base_elevation: f32,
        elevation_variance: f32,
        roughness: f32,
        vegetation_density: f32,
        feature_chance: f32,
    ) -> Self {
        Self {
            base_elevation,
            elevation_variance,
            roughness,
            vegetation_density,
            feature_chance,
        }
    }
}

/// Preset for a biome, chosen by case-insensitive substring match on its name.
pub fn default_config_for(biome_name: &str) -> BiomeGenConfig {
    let name = biome_name.to_lowercase();
    let has = |k: &str| name.contains(k);

    if has("mountain") || has("montagne") {
        BiomeGenConfig::preset(0.7, 0.5, 2.5, 0.3, 0.25)
    } else if has("desert") {
        BiomeGenConfig::preset(0.25, 0.15, 1.2, 0.05, 0.05)
    } else if has("plain") || has("plaine") || has("grass") {
        BiomeGenConfig::preset(0.35, 0.08, 0.8, 0.7, 0.08)
    } else if has("forest") || has("forêt") {
        BiomeGenConfig::preset(0.40, 0.10, 1.0, 0.85, 0.12)
    } else if has("tundra") {
        BiomeGenConfig::preset(0.30, 0.12, 1.3, 0.2, 0.06)
    } else if has("swamp") || has("marais") {
        BiomeGenConfig::preset(0.20, 0.05, 0.9, 0.9, 0.10)
    } else {
        BiomeGenConfig::preset(0.4, 0.1, 1.0, 0.5, 0.1)
    }
}

/// Derive a seed from the global seed, the biome id and the biome name.
/// Never returns 0.
pub fn derive_biome_seed(global_seed: u64, biome_id: usize, name: &str) -> u64 {
    let mut s = global_seed ^ (biome_id as u32).wrapping_mul(0x9E37_79B1) as u64;
    for byte in name.bytes() {
        s = s.wrapping_mul(1_315_423_911).wrapping_add(byte as u64);
    }
    if s == 0 {
        s = 0xA5_A5A5_A5A5 + biome_id as u64;
    }
    s
}

/// Make sure `biome_id` has a seed. Idempotent: an existing non-zero seed is
/// never replaced. Returns the seed in effect.
pub fn ensure_seed(model: &mut WorldRasterModel, biome_id: usize, global_seed: u64) -> u64 {
    if biome_id >= model.biome_seeds.len() {
        model.biome_seeds.resize(biome_id + 1, 0);
    }
    if model.biome_seeds[biome_id] == 0 {
        let name = model.biome_names.get(biome_id).map(String::as_str).unwrap_or("");
        model.biome_seeds[biome_id] = derive_biome_seed(global_seed, biome_id, name);
    }
    model.biome_seeds[biome_id]
}

/// Height sample for raster cell `(x, y)` of a biome with the given seed.
pub fn sample_height(seed: u64, x: usize, y: usize, config: &BiomeGenConfig) -> f32 {
    let mut h = 0.0f64;
    let mut norm = 0.0f64;
    let mut frequency = config.roughness as f64;
    let mut amplitude = 1.0f64;

    for octave in 0..4u64 {
        let nx = (x as f64 * frequency).floor() as i64;
        let ny = (y as f64 * frequency).floor() as i64;
        let n = lattice_value(seed.wrapping_add(octave * OCTAVE_STEP), nx, ny);
        h += n * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    h /= norm;

    let h = config.base_elevation + (h as f32 - 0.5) * config.elevation_variance;
    h.clamp(0.0, 1.0)
}

/// Overwrite the height of every cell classified as `biome_id`. Does nothing
/// until [`ensure_seed`] has run for that biome. Returns the number of cells
/// written.
pub fn generate_heights_for_biome(
    model: &mut WorldRasterModel,
    biome_id: usize,
    config: &BiomeGenConfig,
) -> usize {
    let seed = match model.biome_seeds.get(biome_id) {
        Some(&s) if s != 0 => s,
        _ => return 0,
    };

    let mut written = 0;
    for y in 0..model.height {
        for x in 0..model.width {
            if biome_for_palette(*model.palette_indices.get(x, y)) != Some(biome_id) {
                continue;
            }
            model.tile_heights.set(x, y, sample_height(seed, x, y, config));
            written += 1;
        }
    }
    written
}

/// Summary of an [`enrich_all`] run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnrichStats {
    pub biomes_processed: usize,
    pub cells_written: usize,
}

/// Refine heights for every biome present in the palette raster using the
/// name-based presets.
pub fn enrich_all(model: &mut WorldRasterModel, global_seed: u64) -> EnrichStats {
    let mut stats = EnrichStats::default();
    for biome_id in model.biomes_present() {
        ensure_seed(model, biome_id, global_seed);
        let name = model.biome_name(biome_id).unwrap_or("").to_string();
        let config = default_config_for(&name);
        stats.cells_written += generate_heights_for_biome(model, biome_id, &config);
        stats.biomes_processed += 1;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{palette_for_biome, PALETTE_SHALLOW_WATER};

    #[test]
    fn test_presets_match_by_substring() {
        assert_eq!(default_config_for("High Mountains").base_elevation, 0.7);
        assert_eq!(default_config_for("Hot DESERT").roughness, 1.2);
        assert_eq!(default_config_for("Grassland").vegetation_density, 0.7);
        assert_eq!(default_config_for("Temperate Deciduous Forest").base_elevation, 0.40);
        assert_eq!(default_config_for("Tundra").elevation_variance, 0.12);
        assert_eq!(default_config_for("Swamp").base_elevation, 0.20);
        let fallback = default_config_for("Glacier");
        assert_eq!(fallback, BiomeGenConfig::preset(0.4, 0.1, 1.0, 0.5, 0.1));
    }

    #[test]
    fn test_presets_match_french_names() {
        assert_eq!(default_config_for("Haute Montagne"), default_config_for("Mountain"));
        assert_eq!(default_config_for("Plaine"), default_config_for("Grassland"));
        assert_eq!(default_config_for("FORÊT boréale"), default_config_for("Forest"));
        assert_eq!(default_config_for("Marais salant"), default_config_for("Swamp"));
        assert_ne!(default_config_for("Marais salant"), default_config_for("Glacier"));
    }

    #[test]
    fn test_ensure_seed_is_idempotent() {
        let mut model = WorldRasterModel::synthetic(4, 4, 4.0, 4.0);
        let first = ensure_seed(&mut model, 3, 42);
        assert_ne!(first, 0);
        let second = ensure_seed(&mut model, 3, 9999);
        assert_eq!(first, second, "existing seed must not be replaced");

        model.biome_seeds[5] = 77;
        assert_eq!(ensure_seed(&mut model, 5, 42), 77);
    }

    #[test]
    fn test_ensure_seed_grows_table() {
        let mut model = WorldRasterModel::synthetic(2, 2, 2.0, 2.0);
        let seed = ensure_seed(&mut model, 40, 1);
        assert_eq!(model.biome_seeds.len(), 41);
        assert_eq!(model.biome_seeds[40], seed);
    }

    #[test]
    fn test_seed_depends_on_name() {
        assert_ne!(derive_biome_seed(1, 2, "Taiga"), derive_biome_seed(1, 2, "Tundra"));
        assert_ne!(derive_biome_seed(0, 0, ""), 0);
    }

    #[test]
    fn test_generate_only_touches_biome_cells() {
        let mut model = WorldRasterModel::synthetic(8, 8, 8.0, 8.0);
        model.tile_heights.fill(-1.0);
        for x in 0..8 {
            model.palette_indices.set(x, 0, palette_for_biome(4).unwrap());
            model.palette_indices.set(x, 1, PALETTE_SHALLOW_WATER);
        }

        // Without a seed nothing happens.
        let config = default_config_for("Grassland");
        assert_eq!(generate_heights_for_biome(&mut model, 4, &config), 0);

        ensure_seed(&mut model, 4, 42);
        let written = generate_heights_for_biome(&mut model, 4, &config);
        assert_eq!(written, 8);
        for x in 0..8 {
            let h = *model.tile_heights.get(x, 0);
            assert!((0.0..=1.0).contains(&h));
            assert!((h - config.base_elevation).abs() <= config.elevation_variance * 0.5 + 1e-6);
            assert_eq!(*model.tile_heights.get(x, 1), -1.0);
            assert_eq!(*model.tile_heights.get(x, 2), -1.0);
        }
    }

    #[test]
    fn test_enrich_all_covers_present_biomes() {
        let mut model = WorldRasterModel::synthetic(6, 6, 6.0, 6.0);
        model.palette_indices.set(0, 0, palette_for_biome(9).unwrap());
        let stats = enrich_all(&mut model, 7);
        assert_eq!(stats.biomes_processed, 2);
        assert_eq!(stats.cells_written, 36);
        assert_ne!(model.biome_seeds[0], 0);
        assert_ne!(model.biome_seeds[9], 0);
    }
}
