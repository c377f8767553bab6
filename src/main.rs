use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use world_atlas::adaptive::{fill_mean_heights, AdaptiveCellBuilder};
use world_atlas::biome_heights;
use world_atlas::config::PipelineConfig;
use world_atlas::export;
use world_atlas::scale::MapScale;
use world_atlas::terrain;
use world_atlas::vector_map::{ImportStats, VectorMapParser};
use world_atlas::world::WorldRasterModel;

#[derive(Parser, Debug)]
#[command(name = "world_atlas")]
#[command(about = "Import fantasy vector maps or synthesise terrain into a world raster")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Width of the raster in cells
    #[arg(short = 'W', long, global = true)]
    width: Option<usize>,

    /// Height of the raster in cells
    #[arg(short = 'H', long, global = true)]
    height: Option<usize>,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// Pipeline config file (JSON); explicit flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Real-world width of the whole map in kilometres
    #[arg(long, global = true)]
    km_width: Option<f32>,

    /// Fraction a rectangle's majority palette must cover to stay whole
    #[arg(long, global = true)]
    majority: Option<f32>,

    /// Refine heights per biome after import or synthesis
    #[arg(long, global = true)]
    enrich: bool,

    /// Write preview PNGs and annotations with this path prefix
    #[arg(long, global = true)]
    export_prefix: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a vector map JSON export
    Import {
        /// Path to the map file
        file: PathBuf,

        /// Generate settlement names instead of keeping the source names
        #[arg(long)]
        generate_names: bool,
    },
    /// Synthesise terrain from noise without an imported map
    Synth {
        /// World extent in map units along x (defaults to the raster width)
        #[arg(long)]
        world_width: Option<f32>,

        /// World extent in map units along y (defaults to the raster height)
        #[arg(long)]
        world_height: Option<f32>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Merge the config file with the command-line overrides.
fn resolve_config(args: &Args) -> Result<PipelineConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(w) = args.width {
        config.import.target_width = w;
    }
    if let Some(h) = args.height {
        config.import.target_height = h;
    }
    if let Some(km) = args.km_width {
        config.import.world_km_width = km;
    }
    if let Some(m) = args.majority {
        config.adaptive.majority_threshold = m;
    }
    if let Command::Import { generate_names: true, .. } = args.command {
        config.import.keep_source_names = false;
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&args)?;
    let seed = args.seed.unwrap_or_else(|| rand::random());

    println!("World atlas seed: {}", seed);
    println!(
        "Raster size: {}x{}",
        config.import.target_width, config.import.target_height
    );

    let mut model = match &args.command {
        Command::Import { file, .. } => {
            println!("Importing {}...", file.display());
            let parser = VectorMapParser::new(config.import.clone(), config.adaptive.clone(), seed);
            let (model, stats) = parser.load(file)?;
            print_import_summary(&model, &stats);
            model
        }
        Command::Synth { world_width, world_height } => {
            let world_x = world_width.unwrap_or(config.import.target_width as f32);
            let world_y = world_height.unwrap_or(config.import.target_height as f32);
            println!("Synthesising terrain over {:.0}x{:.0} map units...", world_x, world_y);

            let mut model = WorldRasterModel::synthetic(
                config.import.target_width,
                config.import.target_height,
                world_x,
                world_y,
            );
            model.scale = MapScale::from_world_width(config.import.world_km_width, world_x);
            let stats = terrain::generate_into(&mut model, seed, &config.terrain);
            println!(
                "Terrain: {} land cells ({:.1}%), land height {:.3} to {:.3}",
                stats.land_cells,
                100.0 * stats.land_cells as f64 / (model.width * model.height).max(1) as f64,
                stats.land_min,
                stats.land_max
            );
            model
        }
    };

    if args.enrich {
        println!("Enriching biome heights...");
        let stats = biome_heights::enrich_all(&mut model, seed);
        println!(
            "Enriched {} biomes, {} cells rewritten",
            stats.biomes_processed, stats.cells_written
        );
    }

    // Synthesis and enrichment change heights, so adaptive cells are rebuilt
    // from the final raster.
    if matches!(args.command, Command::Synth { .. }) || args.enrich {
        rebuild_adaptive(&mut model, &config);
    }

    println!("Map size: {}", model.scale.format_map_size(model.world_max_x, model.world_max_y));

    if let Some(prefix) = &args.export_prefix {
        println!("Exporting previews...");
        for path in export::export_all(&model, prefix)? {
            println!("  wrote {}", path);
        }
    }

    Ok(())
}

fn rebuild_adaptive(model: &mut WorldRasterModel, config: &PipelineConfig) {
    let builder = AdaptiveCellBuilder::new(&model.palette_indices, config.adaptive.clone());
    let (mut cells, stats) = builder.build(model.world_max_x, model.world_max_y);
    fill_mean_heights(&mut cells, &model.tile_heights, model.world_max_x, model.world_max_y);
    model.adaptive_cells = cells;
    println!(
        "Adaptive cells: {} ({} splits{})",
        stats.cells,
        stats.splits,
        if stats.truncated { ", cap reached" } else { "" }
    );
}

fn print_import_summary(model: &WorldRasterModel, stats: &ImportStats) {
    println!("Import complete:");
    println!("  File size: {} bytes", stats.file_bytes);
    if stats.surrogates.repaired() > 0 {
        println!(
            "  Neutralised {} unpaired surrogate escapes",
            stats.surrogates.repaired()
        );
    }
    println!(
        "  Source cells: {} ({} placed, {} outside the raster)",
        stats.source_cells, stats.placed_cells, stats.skipped_cells
    );
    println!(
        "  Biomes: {} ({} water, {} default names, {} generated colours)",
        stats.biome_count, stats.water_biomes, stats.default_biome_names, stats.generated_biome_colors
    );
    match stats.shallow_threshold {
        Some(t) => println!("  Water cells: {} (shallow at height >= {:.2})", stats.water_cells, t),
        None => println!("  Water cells: {}", stats.water_cells),
    }
    println!("  States mapped: {}", stats.states_mapped);
    println!(
        "  Polygons: {} cells, {} triangles ({} degenerate), {} invalid vertex refs",
        stats.raster.polygon_cells,
        stats.raster.triangles,
        stats.raster.degenerate_triangles,
        stats.invalid_vertex_refs
    );
    println!(
        "  Country pixels: {} scanline, {} centroid, {} triangle",
        stats.raster.scanline_pixels, stats.centroid_countries, stats.raster.triangle_country_pixels
    );
    println!(
        "  Burgs: {} placed, {} discarded",
        stats.burgs_placed, stats.burgs_discarded
    );
    println!(
        "  Roads: {} imported, {} dropped ({} points dropped)",
        stats.roads_imported, stats.roads_dropped, stats.road_points_dropped
    );
    println!(
        "  Adaptive cells: {}{}{}",
        stats.adaptive.cells,
        if stats.fallback_palette { " (country palette)" } else { "" },
        if stats.adaptive.truncated { ", cap reached" } else { "" }
    );
    println!("  Claimed cells: {}", model.claimed_cells());
    if stats.malformed_records > 0 {
        println!("  Malformed records skipped: {}", stats.malformed_records);
    }
}
