//! Deterministic 64-bit mixing functions.
//!
//! `std::collections::hash_map::DefaultHasher` is not guaranteed stable across
//! releases, so everything that derives seeds or lattice values from inputs
//! goes through these fixed functions instead.

use std::hash::Hasher;

/// Lattice multiplier for the x coordinate.
pub const LATTICE_X: u64 = 0x9E37_79B1_85EB_CA87;
/// Lattice multiplier for the y coordinate.
pub const LATTICE_Y: u64 = 0xC2B2_AE3D_27D4_EB4F;
/// Per-octave seed offset shared by terrain and biome noise.
pub const OCTAVE_STEP: u64 = 0x9E37;

/// SplitMix64 finaliser: avalanche a seed before feeding a PRNG.
#[inline]
pub fn hash64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// MurmurHash3 `fmix64` finaliser.
#[inline]
pub fn fmix64(mut v: u64) -> u64 {
    v ^= v >> 33;
    v = v.wrapping_mul(0xff51_afd7_ed55_8ccd);
    v ^= v >> 33;
    v = v.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    v ^= v >> 33;
    v
}

/// Combine a seed with an integer lattice coordinate.
#[inline]
pub fn mix_lattice(seed: u64, x: i64, y: i64) -> u64 {
    seed ^ (x as u64).wrapping_mul(LATTICE_X) ^ (y as u64).wrapping_mul(LATTICE_Y)
}

/// Map the low 32 bits of an avalanched value to `[0, 1]`.
#[inline]
pub fn unit_from_bits(v: u64) -> f64 {
    (fmix64(v) & 0xFFFF_FFFF) as f64 / 4_294_967_295.0
}

/// A deterministic FNV-1a 64-bit hasher.
#[derive(Debug)]
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// FNV-1a of a string's UTF-8 bytes.
pub fn hash_str(s: &str) -> u64 {
    let mut hasher = FnvHasher::new();
    hasher.write(s.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv_known_values() {
        // Reference FNV-1a 64 vectors.
        assert_eq!(hash_str(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(hash_str("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_unit_range() {
        for i in 0..1000u64 {
            let v = unit_from_bits(mix_lattice(42, i as i64, -(i as i64)));
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_hash64_avalanches_neighbours() {
        assert_ne!(hash64(1), hash64(2));
        assert_ne!(hash64(0), 0);
    }
}
