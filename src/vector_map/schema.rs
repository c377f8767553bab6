//! Normalisation of the raw JSON document into one canonical form.
//!
//! Exports differ in where the arrays live (document root or a nested
//! `pack` object), in how points are written (`x`/`y` or `p: [x, y]`) and in
//! how biomes are listed (array of objects or parallel `biomesData` arrays).
//! Everything downstream reads only [`SourceDocument`].

use serde_json::{Map, Value};

use super::palette::parse_color;
use crate::world::MAX_BIOME_ID;

#[derive(Clone, Debug, PartialEq)]
pub struct SourceCell {
    pub x: f64,
    pub y: f64,
    /// `None` when missing, negative or beyond [`MAX_BIOME_ID`]
    pub biome: Option<usize>,
    /// Negative means water
    pub state: i64,
    pub height: f32,
    /// Vertex references in order; `None` when the cell has no `v` array
    pub vertices: Option<Vec<i64>>,
    /// Non-integer entries dropped from the `v` array
    pub invalid_vertex_refs: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceState {
    pub id: i64,
    pub name: String,
    pub color: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceBiome {
    /// `None` for negative ids
    pub id: Option<usize>,
    pub name: String,
    pub color: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceBurg {
    pub x: f64,
    pub y: f64,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceRoad {
    pub points: Vec<(f64, f64)>,
}

/// The canonical intermediate form of an export
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceDocument {
    pub root_keys: usize,
    pub cells: Vec<SourceCell>,
    pub states: Vec<SourceState>,
    pub biomes: Vec<SourceBiome>,
    pub burgs: Vec<SourceBurg>,
    pub roads: Vec<SourceRoad>,
    /// `None` when the document has no vertex array at all
    pub vertices: Option<Vec<[f32; 2]>>,
    pub biomes_from_parallel_arrays: bool,
    /// Cell biome refs and declared biome ids beyond [`MAX_BIOME_ID`]
    pub out_of_range_biomes: usize,
    /// Non-object entries skipped (or, for vertices, kept as `(0, 0)`)
    pub malformed_records: usize,
}

impl SourceDocument {
    /// Largest biome id referenced by any cell.
    pub fn highest_cell_biome(&self) -> Option<usize> {
        self.cells.iter().filter_map(|c| c.biome).max()
    }

    /// Extent of the cell centroids, starting from zero.
    pub fn extent(&self) -> (f64, f64) {
        self.cells
            .iter()
            .fold((0.0f64, 0.0f64), |(mx, my), c| (mx.max(c.x), my.max(c.y)))
    }
}

// =============================================================================
// LENIENT FIELD ACCESS
// =============================================================================

fn int_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    obj.get(key).and_then(Value::as_i64)
}

fn f64_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}

fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn pair(value: &Value) -> Option<(f64, f64)> {
    let arr = value.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    Some((arr[0].as_f64().unwrap_or(0.0), arr[1].as_f64().unwrap_or(0.0)))
}

/// `x`/`y` when `x` is present, else `p: [x, y]`, else the origin.
fn point(obj: &Map<String, Value>) -> (f64, f64) {
    if obj.contains_key("x") {
        return (f64_field(obj, "x").unwrap_or(0.0), f64_field(obj, "y").unwrap_or(0.0));
    }
    obj.get("p").and_then(pair).unwrap_or((0.0, 0.0))
}

/// `i`, falling back to `id`.
fn record_id(obj: &Map<String, Value>) -> Option<i64> {
    int_field(obj, "i").or_else(|| int_field(obj, "id"))
}

// =============================================================================
// NORMALISATION
// =============================================================================

/// Array under `key` at the root or, failing that, inside `pack`.
fn find_array<'a>(root: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    root.get(key)
        .and_then(Value::as_array)
        .or_else(|| root.get("pack").and_then(|p| p.get(key)).and_then(Value::as_array))
}

fn records<'a>(root: &'a Value, key: &str, malformed: &mut usize) -> Vec<&'a Map<String, Value>> {
    let Some(items) = find_array(root, key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|v| {
            let obj = v.as_object();
            if obj.is_none() {
                *malformed += 1;
            }
            obj
        })
        .collect()
}

fn normalise_cell(obj: &Map<String, Value>) -> SourceCell {
    let (x, y) = point(obj);
    let height = f64_field(obj, "h").or_else(|| f64_field(obj, "height")).unwrap_or(0.0) as f32;
    let refs = obj.get("v").and_then(Value::as_array);
    let vertices: Option<Vec<i64>> = refs.map(|ids| ids.iter().filter_map(Value::as_i64).collect());
    let invalid_vertex_refs = match (refs, &vertices) {
        (Some(raw), Some(kept)) => raw.len() - kept.len(),
        _ => 0,
    };

    SourceCell {
        x,
        y,
        biome: int_field(obj, "biome").and_then(|b| usize::try_from(b).ok()),
        state: int_field(obj, "state").unwrap_or(-1),
        height,
        vertices,
        invalid_vertex_refs,
    }
}

fn normalise_biomes(root: &Value, malformed: &mut usize) -> Vec<SourceBiome> {
    let Some(items) = find_array(root, "biomes") else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, v)| {
            let Some(obj) = v.as_object() else {
                *malformed += 1;
                return None;
            };
            // Position in the array stands in for a missing id.
            let id = match record_id(obj) {
                Some(id) => usize::try_from(id).ok()?,
                None => index,
            };
            Some(SourceBiome {
                id: Some(id),
                name: str_field(obj, "name"),
                color: obj.get("color").and_then(parse_color),
            })
        })
        .collect()
}

/// Zip `biomesData { i, name, color }` into biome records, truncated to the
/// shortest array.
fn biomes_from_parallel(root: &Value) -> Option<Vec<SourceBiome>> {
    let holder = match root.get("pack") {
        Some(pack) if pack.is_object() => pack,
        _ => root,
    };
    let data = holder.get("biomesData")?.as_object()?;
    let ids = data.get("i")?.as_array()?;
    let names = data.get("name")?.as_array()?;
    let colors = data.get("color")?.as_array()?;

    Some(
        ids.iter()
            .zip(names)
            .zip(colors)
            .map(|((id, name), color)| SourceBiome {
                id: id.as_i64().and_then(|i| usize::try_from(i).ok()),
                name: name.as_str().unwrap_or_default().to_string(),
                color: parse_color(color),
            })
            .collect(),
    )
}

fn normalise_road(obj: &Map<String, Value>) -> SourceRoad {
    let points = if let Some(points) = obj.get("points").and_then(Value::as_array) {
        points.iter().filter_map(Value::as_object).map(point).collect()
    } else if let Some(coords) = obj.get("coords").and_then(Value::as_array) {
        coords.iter().filter_map(pair).collect()
    } else {
        Vec::new()
    };
    SourceRoad { points }
}

/// Build the canonical document from a parsed JSON value. Never fails:
/// missing arrays become empty.
pub fn normalise(root: &Value) -> SourceDocument {
    let mut malformed = 0;

    let mut cells: Vec<SourceCell> = records(root, "cells", &mut malformed)
        .into_iter()
        .map(normalise_cell)
        .collect();

    let states = records(root, "states", &mut malformed)
        .into_iter()
        .filter_map(|obj| {
            let id = record_id(obj).filter(|&id| id >= 0)?;
            Some(SourceState {
                id,
                name: str_field(obj, "name"),
                color: obj.get("color").and_then(parse_color),
            })
        })
        .collect();

    let mut biomes = normalise_biomes(root, &mut malformed);
    let mut biomes_from_parallel_arrays = false;
    if biomes.is_empty() {
        if let Some(zipped) = biomes_from_parallel(root) {
            biomes = zipped;
            biomes_from_parallel_arrays = true;
        }
    }

    // Biome ids must fit a palette index.
    let mut out_of_range_biomes = 0;
    for cell in cells.iter_mut() {
        if cell.biome.is_some_and(|b| b > MAX_BIOME_ID) {
            cell.biome = None;
            out_of_range_biomes += 1;
        }
    }
    biomes.retain(|b| {
        let fits = b.id.map_or(true, |id| id <= MAX_BIOME_ID);
        if !fits {
            out_of_range_biomes += 1;
        }
        fits
    });

    let burgs = records(root, "burgs", &mut malformed)
        .into_iter()
        .map(|obj| {
            let (x, y) = point(obj);
            SourceBurg {
                x,
                y,
                name: str_field(obj, "name"),
            }
        })
        .collect();

    let roads = records(root, "roads", &mut malformed)
        .into_iter()
        .map(normalise_road)
        .collect();

    // Vertex slots must stay aligned with cell references, so malformed
    // entries are kept as the origin.
    let vertices = find_array(root, "vertices").map(|items| {
        items
            .iter()
            .map(|v| match v.as_object() {
                Some(obj) => {
                    let (x, y) = obj.get("p").and_then(pair).unwrap_or((0.0, 0.0));
                    [x as f32, y as f32]
                }
                None => {
                    malformed += 1;
                    [0.0, 0.0]
                }
            })
            .collect()
    });

    SourceDocument {
        root_keys: root.as_object().map_or(0, Map::len),
        cells,
        states,
        biomes,
        burgs,
        roads,
        vertices,
        biomes_from_parallel_arrays,
        out_of_range_biomes,
        malformed_records: malformed,
    }
}
