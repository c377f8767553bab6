//! Preview rendering of a world raster model.
//!
//! `render_*` functions build an `RgbImage` in memory; `export_*` functions
//! write PNG/JSON files next to each other under a common path prefix.

use std::error::Error;
use std::fs;

use image::{ImageBuffer, Rgb, RgbImage};
use serde::Serialize;

use crate::tilemap::Tilemap;
use crate::world::{
    biome_for_palette, AdaptiveCell, CountryInfo, HeightStats, Place, Road, WorldRasterModel, NO_COUNTRY,
    PALETTE_DEEP_WATER, PALETTE_SHALLOW_WATER,
};

const DEEP_WATER_RGB: [u8; 3] = [24, 48, 110];
const SHALLOW_WATER_RGB: [u8; 3] = [64, 120, 190];
const UNKNOWN_BIOME_RGB: [u8; 3] = [112, 112, 112];
const UNCLAIMED_RGB: [u8; 3] = [16, 24, 40];
const OUTLINE_RGB: [u8; 3] = [20, 20, 20];

/// Unpack `0xRRGGBB`.
pub fn rgb_from_packed(c: u32) -> [u8; 3] {
    [(c >> 16) as u8, (c >> 8) as u8, c as u8]
}

/// Spectral colormap (matplotlib style): dark blue -> cyan -> green -> yellow -> orange -> red
fn spectral_colormap(t: f32) -> [u8; 3] {
    let colors: [[f32; 3]; 11] = [
        [0.37, 0.31, 0.64],
        [0.20, 0.53, 0.74],
        [0.40, 0.76, 0.65],
        [0.67, 0.87, 0.64],
        [0.90, 0.96, 0.60],
        [1.00, 1.00, 0.75],
        [1.00, 0.88, 0.55],
        [0.99, 0.68, 0.38],
        [0.96, 0.43, 0.26],
        [0.84, 0.24, 0.31],
        [0.62, 0.00, 0.26],
    ];

    let t_scaled = t.clamp(0.0, 1.0) * 10.0;
    let idx = (t_scaled as usize).min(9);
    let frac = t_scaled - idx as f32;

    let c1 = colors[idx];
    let c2 = colors[idx + 1];

    [
        ((c1[0] + (c2[0] - c1[0]) * frac) * 255.0) as u8,
        ((c1[1] + (c2[1] - c1[1]) * frac) * 255.0) as u8,
        ((c1[2] + (c2[2] - c1[2]) * frac) * 255.0) as u8,
    ]
}

/// Colour of one palette index using the model's biome colours.
pub fn palette_color(model: &WorldRasterModel, palette_index: u16) -> [u8; 3] {
    match palette_index {
        PALETTE_DEEP_WATER => DEEP_WATER_RGB,
        PALETTE_SHALLOW_WATER => SHALLOW_WATER_RGB,
        p => biome_for_palette(p)
            .and_then(|b| model.biome_colors_rgb.get(b))
            .map(|&c| rgb_from_packed(c))
            .unwrap_or(UNKNOWN_BIOME_RGB),
    }
}

fn render_grid<T>(grid: &Tilemap<T>, color: impl Fn(&T) -> [u8; 3]) -> RgbImage
where
    T: Clone,
{
    ImageBuffer::from_fn(grid.width as u32, grid.height as u32, |x, y| {
        Rgb(color(grid.get(x as usize, y as usize)))
    })
}

/// Palette raster: water blues and biome colours.
pub fn render_palette(model: &WorldRasterModel) -> RgbImage {
    render_grid(&model.palette_indices, |&p| palette_color(model, p))
}

/// Country raster: each country in its source colour.
pub fn render_countries(model: &WorldRasterModel) -> RgbImage {
    render_grid(&model.countries, |&c| {
        if c == NO_COUNTRY {
            return UNCLAIMED_RGB;
        }
        model
            .country_colors_rgb
            .get(c as usize)
            .map(|&rgb| rgb_from_packed(rgb))
            .unwrap_or(UNKNOWN_BIOME_RGB)
    })
}

/// Render heightmap to image buffer using spectral colormap.
/// Automatically normalizes values to 0-1 range.
pub fn render_heights(heights: &Tilemap<f32>) -> RgbImage {
    let Some((min_val, max_val)) = heights.value_range() else {
        return RgbImage::new(0, 0);
    };
    let range = max_val - min_val;
    if range < 0.001 {
        // Flat heightmap, return gray
        return render_grid(heights, |_| [128, 128, 128]);
    }
    render_grid(heights, |&h| spectral_colormap((h - min_val) / range))
}

/// Palette colours modulated by a simple north-west hillshade of the heights.
pub fn render_relief(model: &WorldRasterModel) -> RgbImage {
    let heights = &model.tile_heights;
    let scale = match heights.value_range() {
        Some((lo, hi)) if hi - lo > 0.001 => 1.0 / (hi - lo),
        _ => 0.0,
    };

    let mut img = render_palette(model);
    for y in 0..heights.height {
        for x in 0..heights.width {
            let h = |dx: i64, dy: i64| {
                let nx = (x as i64 + dx).clamp(0, heights.width as i64 - 1) as usize;
                let ny = (y as i64 + dy).clamp(0, heights.height as i64 - 1) as usize;
                *heights.get(nx, ny) * scale
            };
            let gx = h(1, 0) - h(-1, 0);
            let gy = h(0, 1) - h(0, -1);
            let shade = (1.0 - (gx + gy) * 4.0).clamp(0.6, 1.3);

            let px = img.get_pixel_mut(x as u32, y as u32);
            for channel in px.0.iter_mut() {
                *channel = (*channel as f32 * shade).clamp(0.0, 255.0) as u8;
            }
        }
    }
    img
}

/// Outline every adaptive cell on top of the palette render.
pub fn render_adaptive(model: &WorldRasterModel) -> RgbImage {
    let mut img = render_palette(model);
    if model.width == 0 || model.height == 0 || model.world_max_x <= 0.0 || model.world_max_y <= 0.0 {
        return img;
    }
    let px_per_unit_x = model.width as f32 / model.world_max_x;
    let px_per_unit_y = model.height as f32 / model.world_max_y;
    let max_x = model.width as u32 - 1;
    let max_y = model.height as u32 - 1;

    for cell in &model.adaptive_cells {
        let x0 = ((cell.x * px_per_unit_x).round() as u32).min(max_x);
        let y0 = ((cell.y * px_per_unit_y).round() as u32).min(max_y);
        let x1 = (((cell.x + cell.w) * px_per_unit_x).round() as u32).saturating_sub(1).min(max_x);
        let y1 = (((cell.y + cell.h) * px_per_unit_y).round() as u32).saturating_sub(1).min(max_y);
        for x in x0..=x1.max(x0) {
            img.put_pixel(x, y0, Rgb(OUTLINE_RGB));
        }
        for y in y0..=y1.max(y0) {
            img.put_pixel(x0, y, Rgb(OUTLINE_RGB));
        }
    }
    img
}

/// A settlement with its raster cell and the world position of that cell.
#[derive(Serialize)]
pub struct PlaceAnnotation<'a> {
    pub name: &'a str,
    pub kind: &'a str,
    pub x: usize,
    pub y: usize,
    pub world_x: f32,
    pub world_y: f32,
}

/// Vector overlays of a model, written as JSON next to the renders.
#[derive(Serialize)]
pub struct Annotations<'a> {
    pub width: usize,
    pub height: usize,
    pub world_max_x: f32,
    pub world_max_y: f32,
    pub km_per_unit: f32,
    pub height_stats: HeightStats,
    pub biome_names: &'a [String],
    pub countries: &'a [CountryInfo],
    pub places: Vec<PlaceAnnotation<'a>>,
    pub roads: &'a [Road],
    pub adaptive_cells: &'a [AdaptiveCell],
}

impl<'a> Annotations<'a> {
    pub fn from_model(model: &'a WorldRasterModel) -> Self {
        Self {
            width: model.width,
            height: model.height,
            world_max_x: model.world_max_x,
            world_max_y: model.world_max_y,
            km_per_unit: model.scale.km_per_unit,
            height_stats: model.height_stats,
            biome_names: &model.biome_names,
            countries: &model.country_infos,
            places: model.places.iter().map(|p| place_annotation(model, p)).collect(),
            roads: &model.roads,
            adaptive_cells: &model.adaptive_cells,
        }
    }
}

fn place_annotation<'a>(model: &WorldRasterModel, place: &'a Place) -> PlaceAnnotation<'a> {
    let (world_x, world_y) = model.raster_to_world(place.x, place.y);
    PlaceAnnotation {
        name: &place.name,
        kind: &place.kind,
        x: place.x,
        y: place.y,
        world_x,
        world_y,
    }
}

pub fn export_annotations(model: &WorldRasterModel, path: &str) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(&Annotations::from_model(model))?;
    fs::write(path, json)?;
    Ok(())
}

/// Write every preview under `prefix` and return the paths written.
pub fn export_all(model: &WorldRasterModel, prefix: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let renders = [
        ("palette", render_palette(model)),
        ("countries", render_countries(model)),
        ("heights", render_heights(&model.tile_heights)),
        ("relief", render_relief(model)),
        ("adaptive", render_adaptive(model)),
    ];

    let mut written = Vec::new();
    for (name, img) in renders {
        let path = format!("{}_{}.png", prefix, name);
        img.save(&path)?;
        written.push(path);
    }

    let path = format!("{}_annotations.json", prefix);
    export_annotations(model, &path)?;
    written.push(path);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::palette_for_biome;

    fn model() -> WorldRasterModel {
        let mut model = WorldRasterModel::synthetic(8, 4, 8.0, 4.0);
        model.biome_colors_rgb[3] = 0x11_22_33;
        model.palette_indices.set(0, 0, PALETTE_DEEP_WATER);
        model.palette_indices.set(1, 0, PALETTE_SHALLOW_WATER);
        model.palette_indices.set(2, 0, palette_for_biome(3).unwrap());
        model.palette_indices.set(3, 0, palette_for_biome(200).unwrap());
        model.country_colors_rgb = vec![0, 0xFF_00_00];
        model.countries.set(5, 2, 1);
        model
    }

    #[test]
    fn test_rgb_from_packed() {
        assert_eq!(rgb_from_packed(0x12_34_56), [0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_render_palette_colors() {
        let model = model();
        let img = render_palette(&model);
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(0, 0).0, DEEP_WATER_RGB);
        assert_eq!(img.get_pixel(1, 0).0, SHALLOW_WATER_RGB);
        assert_eq!(img.get_pixel(2, 0).0, [0x11, 0x22, 0x33]);
        assert_eq!(img.get_pixel(3, 0).0, UNKNOWN_BIOME_RGB, "biome outside the table");
    }

    #[test]
    fn test_render_countries() {
        let img = render_countries(&model());
        assert_eq!(img.get_pixel(5, 2).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(0, 0).0, UNCLAIMED_RGB);
    }

    #[test]
    fn test_render_heights_flat_is_gray() {
        let flat = Tilemap::new_with(3, 3, 0.4f32);
        assert_eq!(render_heights(&flat).get_pixel(1, 1).0, [128, 128, 128]);

        let mut ramp = Tilemap::new_with(2, 1, 0.0f32);
        ramp.set(1, 0, 1.0);
        let img = render_heights(&ramp);
        assert_ne!(img.get_pixel(0, 0), img.get_pixel(1, 0));
    }

    #[test]
    fn test_render_adaptive_draws_outlines() {
        let mut model = model();
        model.adaptive_cells = vec![AdaptiveCell { x: 4.0, y: 0.0, w: 4.0, h: 4.0, palette_index: 2, mean_height: 0.0 }];
        let img = render_adaptive(&model);
        assert_eq!(img.get_pixel(4, 0).0, OUTLINE_RGB);
        assert_eq!(img.get_pixel(4, 3).0, OUTLINE_RGB);
        assert_eq!(img.get_pixel(7, 0).0, OUTLINE_RGB);
        assert_ne!(img.get_pixel(6, 2).0, OUTLINE_RGB);
    }

    #[test]
    fn test_export_all_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("world");
        let written = export_all(&model(), prefix.to_str().unwrap()).unwrap();
        assert_eq!(written.len(), 6);
        for path in &written {
            assert!(std::path::Path::new(path).exists(), "{} missing", path);
        }

        let json = fs::read_to_string(written.last().unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["width"], 8);
        assert_eq!(value["biome_names"][12], "Wetland");
    }

    #[test]
    fn test_annotations_place_world_positions() {
        let mut model = model();
        model.places.push(Place {
            name: "Harbour".to_string(),
            kind: "city".to_string(),
            x: 7,
            y: 3,
        });
        let annotations = Annotations::from_model(&model);
        assert_eq!(annotations.places.len(), 1);
        assert_eq!(annotations.places[0].name, "Harbour");
        assert_eq!((annotations.places[0].world_x, annotations.places[0].world_y), (8.0, 4.0));
    }
}
