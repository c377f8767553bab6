//! Procedural terrain height synthesis for the no-import path.
//!
//! 1. Multi-octave value-noise fBm sampled in world coordinates
//! 2. Linear global slope
//! 3. 3x3 box blur passes
//! 4. Sea-level clamp mapping `(sea_level, 1]` onto `(0, global_amplitude]`

use serde::{Deserialize, Serialize};

use crate::noise_field::fbm;
use crate::tilemap::Tilemap;
use crate::world::{HeightStats, WorldRasterModel};

// =============================================================================
// PARAMETERS
// =============================================================================

/// Parameters for terrain synthesis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Number of noise octaves
    pub octaves: u32,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
    /// Amplitude multiplier per octave
    pub gain: f64,
    /// Frequency of the first octave, in cycles per world unit
    pub base_frequency: f64,
    /// Height of the highest land after the sea-level clamp
    pub global_amplitude: f32,
    /// Normalised noise value at or below which a cell is sea
    pub sea_level: f32,
    /// Number of 3x3 box blur passes (0 = raw)
    pub blur_passes: u32,
    /// Global slope along x, centred on the map middle
    pub slope_x: f32,
    /// Global slope along y, centred on the map middle
    pub slope_y: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 9,
            lacunarity: 2.07,
            gain: 0.68,
            base_frequency: 0.00373,
            global_amplitude: 0.68,
            sea_level: 0.48,
            blur_passes: 2,
            slope_x: 0.0,
            slope_y: 0.0,
        }
    }
}

/// Land height range of a synthesised field. Both bounds are 0 when the
/// field has no land.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TerrainStats {
    pub land_min: f32,
    pub land_max: f32,
    pub land_cells: usize,
}

// =============================================================================
// SYNTHESIS
// =============================================================================

/// Normalised `[0, 1]` field after fBm, slope and blur, before the sea-level
/// clamp.
pub fn synthesize_field(
    width: usize,
    height: usize,
    world_max_x: f32,
    world_max_y: f32,
    seed: u64,
    config: &NoiseConfig,
) -> Tilemap<f32> {
    let mut field = Tilemap::new_with(width, height, 0.0f32);
    if width == 0 || height == 0 {
        return field;
    }

    let span_x = width.saturating_sub(1).max(1) as f64;
    let span_y = height.saturating_sub(1).max(1) as f64;

    for (x, y, value) in field.iter_mut() {
        let nx = x as f64 / span_x;
        let ny = y as f64 / span_y;
        let wx = if world_max_x > 0.0 { nx * world_max_x as f64 } else { x as f64 };
        let wy = if world_max_y > 0.0 { ny * world_max_y as f64 } else { y as f64 };

        let mut h = fbm(
            seed,
            wx,
            wy,
            config.octaves,
            config.base_frequency,
            config.lacunarity,
            config.gain,
        );
        h += (nx - 0.5) * config.slope_x as f64 * 0.1 + (ny - 0.5) * config.slope_y as f64 * 0.1;
        *value = h.clamp(0.0, 1.0) as f32;
    }

    for _ in 0..config.blur_passes {
        field = field.box_blur();
    }

    field
}

/// Apply the sea-level clamp to a normalised field.
pub fn apply_sea_level(field: &Tilemap<f32>, config: &NoiseConfig) -> (Tilemap<f32>, TerrainStats) {
    let mut heights = Tilemap::new_with(field.width, field.height, 0.0f32);
    let mut land_min = f32::MAX;
    let mut land_max = f32::MIN;
    let mut land_cells = 0usize;

    for (x, y, &n) in field.iter() {
        let h = if n <= config.sea_level {
            0.0
        } else {
            (n - config.sea_level) / (1.0 - config.sea_level) * config.global_amplitude
        };
        heights.set(x, y, h);
        if h > 0.0 {
            land_cells += 1;
            land_min = land_min.min(h);
            land_max = land_max.max(h);
        }
    }

    let stats = if land_cells == 0 {
        TerrainStats::default()
    } else {
        TerrainStats { land_min, land_max, land_cells }
    };
    (heights, stats)
}

/// Generate a relative height raster: 0 = sea level, land in
/// `(0, global_amplitude]`.
pub fn generate(
    width: usize,
    height: usize,
    world_max_x: f32,
    world_max_y: f32,
    seed: u64,
    config: &NoiseConfig,
) -> (Tilemap<f32>, TerrainStats) {
    let field = synthesize_field(width, height, world_max_x, world_max_y, seed, config);
    apply_sea_level(&field, config)
}

/// Replace the model's heights with freshly synthesised terrain.
pub fn generate_into(model: &mut WorldRasterModel, seed: u64, config: &NoiseConfig) -> TerrainStats {
    let (heights, stats) = generate(
        model.width,
        model.height,
        model.world_max_x,
        model.world_max_y,
        seed,
        config,
    );
    model.tile_heights = heights;
    model.height_stats = HeightStats {
        land_min: stats.land_min,
        land_max: stats.land_max,
        water_min: 0.0,
        water_max: 0.0,
    };

    tracing::debug!(
        target: "world_atlas::terrain",
        seed,
        land_cells = stats.land_cells,
        land_min = stats.land_min,
        land_max = stats.land_max,
        "terrain.generated"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> NoiseConfig {
        NoiseConfig {
            base_frequency: 0.05,
            ..NoiseConfig::default()
        }
    }

    #[test]
    fn test_generate_is_bit_reproducible() {
        let config = small_config();
        let (a, stats_a) = generate(64, 48, 64.0, 48.0, 1234, &config);
        let (b, stats_b) = generate(64, 48, 64.0, 48.0, 1234, &config);
        let bits_a: Vec<u32> = a.as_slice().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.as_slice().iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
        assert_eq!(stats_a, stats_b);
    }

    #[test]
    fn test_generate_known_values() {
        let config = small_config();
        let field = synthesize_field(8, 6, 80.0, 60.0, 1234, &config);
        assert_eq!(field.get(0, 0).to_bits(), 0x3ef1_e2d6);
        assert_eq!(field.get(3, 2).to_bits(), 0x3f0a_37df);
        assert_eq!(field.get(7, 5).to_bits(), 0x3f12_826e);

        let (heights, stats) = generate(8, 6, 80.0, 60.0, 1234, &config);
        assert_eq!(*heights.get(0, 0), 0.0);
        assert_eq!(heights.get(3, 2).to_bits(), 0x3da0_7631);
        assert_eq!(heights.get(7, 5).to_bits(), 0x3df7_336d);
        assert_eq!(heights.get(5, 1).to_bits(), 0x3e02_da9d);
        assert_eq!(stats.land_cells, 47);
    }

    #[test]
    fn test_seed_changes_terrain() {
        let config = small_config();
        let (a, _) = generate(32, 32, 32.0, 32.0, 1, &config);
        let (b, _) = generate(32, 32, 32.0, 32.0, 2, &config);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sea_level_invariant() {
        let config = small_config();
        let field = synthesize_field(64, 64, 64.0, 64.0, 77, &config);
        let (heights, stats) = apply_sea_level(&field, &config);

        for (x, y, &n) in field.iter() {
            let h = *heights.get(x, y);
            assert_eq!(h == 0.0, n <= config.sea_level, "cell ({}, {}) n={} h={}", x, y, n, h);
            if h > 0.0 {
                assert!(h <= config.global_amplitude + 1e-6);
            }
        }
        if stats.land_cells > 0 {
            assert!(stats.land_min > 0.0);
            assert!(stats.land_min <= stats.land_max);
            assert!(stats.land_max <= config.global_amplitude + 1e-6);
        }
    }

    #[test]
    fn test_no_land_stats_default_to_zero() {
        let config = NoiseConfig {
            sea_level: 1.0,
            ..small_config()
        };
        let (heights, stats) = generate(16, 16, 16.0, 16.0, 5, &config);
        assert!(heights.as_slice().iter().all(|&h| h == 0.0));
        assert_eq!(stats, TerrainStats::default());
    }

    #[test]
    fn test_field_is_normalised() {
        let config = NoiseConfig {
            slope_x: 20.0,
            slope_y: -20.0,
            ..small_config()
        };
        let field = synthesize_field(40, 30, 400.0, 300.0, 9, &config);
        assert!(field.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_slope_raises_one_side() {
        let flat = NoiseConfig {
            blur_passes: 0,
            ..small_config()
        };
        let sloped = NoiseConfig { slope_x: 4.0, ..flat.clone() };
        let a = synthesize_field(32, 8, 32.0, 8.0, 3, &flat);
        let b = synthesize_field(32, 8, 32.0, 8.0, 3, &sloped);
        let mean_right = |m: &Tilemap<f32>| (0..8).map(|y| *m.get(31, y)).sum::<f32>();
        assert!(mean_right(&b) >= mean_right(&a));
    }

    #[test]
    fn test_generate_into_updates_model() {
        let mut model = WorldRasterModel::synthetic(24, 24, 24.0, 24.0);
        let stats = generate_into(&mut model, 11, &small_config());
        assert_eq!(model.height_stats.land_max, stats.land_max);
        assert!(model.tile_heights.as_slice().iter().all(|&h| h >= 0.0));
    }
}
