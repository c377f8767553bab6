//! Coherent value noise on an integer hash lattice.
//!
//! Lattice corners are hashed with a fixed 64-bit mix so sampling is
//! bit-reproducible for a given seed. Samples lie in `[0, 1]`.

use noise::NoiseFn;

use crate::hashing::{mix_lattice, unit_from_bits, OCTAVE_STEP};

/// Lattice value at integer coordinates, in `[0, 1]`.
#[inline]
pub fn lattice_value(seed: u64, x: i64, y: i64) -> f64 {
    unit_from_bits(mix_lattice(seed, x, y))
}

/// Cubic ease `3t² - 2t³`.
#[inline]
pub fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Bilinearly interpolated value noise with smoothstep easing.
#[derive(Clone, Copy, Debug)]
pub struct ValueNoise {
    seed: u64,
}

impl ValueNoise {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Noise for octave `octave` of a fractal stack rooted at `seed`.
    pub fn for_octave(seed: u64, octave: u32) -> Self {
        Self::new(seed.wrapping_add(octave as u64 * OCTAVE_STEP))
    }

    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let fx0 = x.floor();
        let fy0 = y.floor();
        let ix = fx0 as i64;
        let iy = fy0 as i64;
        let tx = smoothstep(x - fx0);
        let ty = smoothstep(y - fy0);

        let v00 = lattice_value(self.seed, ix, iy);
        let v10 = lattice_value(self.seed, ix + 1, iy);
        let v01 = lattice_value(self.seed, ix, iy + 1);
        let v11 = lattice_value(self.seed, ix + 1, iy + 1);

        let top = v00 + (v10 - v00) * tx;
        let bottom = v01 + (v11 - v01) * tx;
        top + (bottom - top) * ty
    }
}

impl NoiseFn<f64, 2> for ValueNoise {
    fn get(&self, point: [f64; 2]) -> f64 {
        self.sample(point[0], point[1])
    }
}

/// Fractional Brownian motion over value noise, one independently seeded
/// lattice per octave. Normalised by the amplitude sum, so the result stays
/// in `[0, 1]`.
pub fn fbm(
    seed: u64,
    x: f64,
    y: f64,
    octaves: u32,
    base_frequency: f64,
    lacunarity: f64,
    gain: f64,
) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = base_frequency;
    let mut norm = 0.0;

    for octave in 0..octaves {
        let noise = ValueNoise::for_octave(seed, octave);
        total += amplitude * noise.get([x * frequency, y * frequency]);
        norm += amplitude;
        amplitude *= gain;
        frequency *= lacunarity;
    }

    if norm > 0.0 {
        total / norm
    } else {
        0.0
    }
}
