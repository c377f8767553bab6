//! Biome table construction: names, colours and water detection.

use serde_json::Value;

use crate::world::DEFAULT_BIOME_NAMES;

use super::schema::SourceBiome;

/// Colour given to biomes the source did not colour.
pub const PLACEHOLDER_COLOR: u32 = 0x70_70_70;

/// Lower-case substrings that mark a biome name as water.
pub const WATER_KEYWORDS: [&str; 23] = [
    "ocean", "sea", "lake", "water", "coast", "shore", "shallows", "shoal", "reef", "bay", "lagoon",
    "gulf", "channel", "strait", "fjord", "sound", "estuary", "delta", "marsh", "swamp", "bog",
    "wetland", "river",
];

pub fn is_water_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    WATER_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Parse a `#RRGGBB` string or a packed unsigned integer colour.
pub fn parse_color(value: &Value) -> Option<u32> {
    match value {
        Value::String(s) => {
            let hex = s.strip_prefix('#')?;
            if hex.len() != 6 {
                return None;
            }
            u32::from_str_radix(hex, 16).ok().map(|c| c & 0xFF_FFFF)
        }
        Value::Number(n) => n.as_u64().map(|c| (c & 0xFF_FFFF) as u32),
        _ => None,
    }
}

/// HSV (all in `[0, 1]`, hue wraps) to packed `0xRRGGBB`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> u32 {
    let h = h - h.floor();
    let c = v * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h * 6.0).floor() as i32 % 6 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_byte = |f: f32| ((f + m) * 255.0).round() as u32;
    (to_byte(r) << 16) | (to_byte(g) << 8) | to_byte(b)
}

/// Distinct fallback colour for biome `index` (golden-ratio hue steps).
/// Index 0 gets a dark blue.
pub fn fallback_color(index: usize) -> u32 {
    if index == 0 {
        return hsv_to_rgb(0.58, 0.50, 0.55);
    }
    let hue = (0.123f32 + index as f32 * 0.618_033_988_75) % 1.0;
    hsv_to_rgb(hue, 0.55, 0.85)
}

/// Resolved biome table, indexed by biome id
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BiomeTable {
    pub names: Vec<String>,
    pub colors: Vec<u32>,
    pub water: Vec<bool>,
    pub default_names_filled: usize,
    pub generated_colors: usize,
}

impl BiomeTable {
    /// Size is `max(declared ids, highest cell biome) + 1`. Declared ids out
    /// of that range or negative are ignored. Water detection runs on the
    /// declared names only, before default names are filled in.
    pub fn build(biomes: &[SourceBiome], highest_cell_biome: Option<usize>) -> Self {
        let max_declared = biomes.iter().filter_map(|b| b.id).max();
        let size = max_declared.max(highest_cell_biome).map_or(1, |m| m + 1);

        let mut table = Self {
            names: vec![String::new(); size],
            colors: vec![PLACEHOLDER_COLOR; size],
            water: vec![false; size],
            default_names_filled: 0,
            generated_colors: 0,
        };

        for biome in biomes {
            let Some(id) = biome.id.filter(|&id| id < size) else {
                continue;
            };
            table.names[id] = biome.name.clone();
            if let Some(color) = biome.color {
                table.colors[id] = color;
            }
            table.water[id] = is_water_name(&biome.name);
        }

        for (name, default) in table.names.iter_mut().zip(DEFAULT_BIOME_NAMES) {
            if name.is_empty() {
                *name = default.to_string();
                table.default_names_filled += 1;
            }
        }

        for (i, color) in table.colors.iter_mut().enumerate() {
            if *color == PLACEHOLDER_COLOR {
                *color = fallback_color(i);
                table.generated_colors += 1;
            }
        }

        table
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_water(&self, biome: Option<usize>) -> bool {
        biome.and_then(|b| self.water.get(b).copied()).unwrap_or(false)
    }

    pub fn water_biome_count(&self) -> usize {
        self.water.iter().filter(|&&w| w).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn biome(id: usize, name: &str, color: Option<u32>) -> SourceBiome {
        SourceBiome {
            id: Some(id),
            name: name.to_string(),
            color,
        }
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color(&json!("#ff8000")), Some(0xFF8000));
        assert_eq!(parse_color(&json!("#FFF")), None);
        assert_eq!(parse_color(&json!("ff8000")), None);
        assert_eq!(parse_color(&json!(0x12345678u32)), Some(0x345678));
        assert_eq!(parse_color(&json!(-5)), None);
        assert_eq!(parse_color(&json!(null)), None);
    }

    #[test]
    fn test_water_keywords() {
        assert!(is_water_name("Deep Ocean"));
        assert!(is_water_name("SWAMP"));
        assert!(is_water_name("Coral Reef"));
        assert!(!is_water_name("Hot Desert"));
        assert!(!is_water_name("Taiga"));
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), 0xFF0000);
        assert_eq!(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0), 0x00FF00);
        assert_eq!(hsv_to_rgb(2.0 / 3.0, 1.0, 1.0), 0x0000FF);
        assert_eq!(hsv_to_rgb(0.5, 0.0, 1.0), 0xFFFFFF);
    }

    #[test]
    fn test_fallback_colors_are_distinct() {
        let colors: Vec<u32> = (0..13).map(fallback_color).collect();
        for i in 0..colors.len() {
            for j in i + 1..colors.len() {
                assert_ne!(colors[i], colors[j], "biomes {} and {} share a colour", i, j);
            }
        }
        // Index 0 is a dark blue: blue channel dominates.
        let c0 = colors[0];
        assert!((c0 & 0xFF) > (c0 >> 16));
    }

    #[test]
    fn test_table_size_covers_cell_references() {
        let table = BiomeTable::build(&[biome(2, "Savanna", Some(0x00AA00))], Some(15));
        assert_eq!(table.len(), 16);
        assert_eq!(table.names[2], "Savanna");
        assert_eq!(table.colors[2], 0x00AA00);
        // Defaults fill 0..=12 except the declared id 2.
        assert_eq!(table.names[0], "Marine");
        assert_eq!(table.names[12], "Wetland");
        assert_eq!(table.default_names_filled, 12);
        assert!(table.names[13].is_empty());
        assert_eq!(table.generated_colors, 15);
    }

    #[test]
    fn test_water_uses_declared_names() {
        let table = BiomeTable::build(&[biome(1, "Lagoon", None), biome(3, "", None)], None);
        assert!(table.is_water(Some(1)));
        // "Marine" filled in by default does not make biome 0 water.
        assert_eq!(table.names[0], "Marine");
        assert!(!table.is_water(Some(0)));
        assert!(!table.is_water(Some(3)));
        assert!(!table.is_water(None));
        assert!(!table.is_water(Some(99)));
        assert_eq!(table.water_biome_count(), 1);
    }

    #[test]
    fn test_empty_table() {
        let table = BiomeTable::build(&[], None);
        assert_eq!(table.len(), 1);
        assert_eq!(table.names[0], "Marine");
    }
}
