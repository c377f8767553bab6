//! Map scale: conversion between source map units and kilometres.
//!
//! The map is a flat Euclidean plane. The user chooses how many kilometres
//! the full map width spans and everything else follows linearly.

/// Default real-world width of an imported map.
pub const DEFAULT_WORLD_KM_WIDTH: f32 = 2700.0;

/// Map scale configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapScale {
    /// Kilometres represented by one source map unit
    pub km_per_unit: f32,
}

impl MapScale {
    pub fn new(km_per_unit: f32) -> Self {
        Self { km_per_unit }
    }

    /// Scale for a map whose x extent is `max_x` units and whose real width is
    /// `world_km_width`. Falls back to 1 km/unit if either is non-positive.
    pub fn from_world_width(world_km_width: f32, max_x: f32) -> Self {
        if world_km_width > 0.0 && max_x > 0.0 {
            Self::new(world_km_width / max_x)
        } else {
            Self::new(1.0)
        }
    }

    pub fn units_to_km(&self, units: f32) -> f32 {
        units * self.km_per_unit
    }

    /// Calculate the total map dimensions in kilometres
    pub fn map_size_km(&self, max_x: f32, max_y: f32) -> (f32, f32) {
        (self.units_to_km(max_x), self.units_to_km(max_y))
    }

    /// Format map size as a human-readable string
    pub fn format_map_size(&self, max_x: f32, max_y: f32) -> String {
        let (w_km, h_km) = self.map_size_km(max_x, max_y);
        if w_km >= 1000.0 {
            format!("{:.1} × {:.1} thousand km", w_km / 1000.0, h_km / 1000.0)
        } else {
            format!("{:.0} × {:.0} km", w_km, h_km)
        }
    }
}

impl Default for MapScale {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_km_per_unit_from_width() {
        let scale = MapScale::from_world_width(2700.0, 2000.0);
        assert!((scale.km_per_unit - 1.35).abs() < 1e-6);
        assert!((scale.units_to_km(2000.0) - 2700.0).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_width_falls_back() {
        assert_eq!(MapScale::from_world_width(0.0, 2000.0).km_per_unit, 1.0);
        assert_eq!(MapScale::from_world_width(2700.0, 0.0).km_per_unit, 1.0);
    }

    #[test]
    fn test_map_size() {
        let scale = MapScale::from_world_width(2700.0, 2000.0);
        let (w, h) = scale.map_size_km(2000.0, 1000.0);
        assert!((w - 2700.0).abs() < 0.1);
        assert!((h - 1350.0).abs() < 0.1);
        assert!(scale.format_map_size(2000.0, 1000.0).contains("thousand km"));
    }
}
