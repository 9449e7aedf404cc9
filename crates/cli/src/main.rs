//! Verdant CLI - per-pixel phenology from monthly vegetation index composites

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use verdant_algorithms::phenology::{
    phenology_pixel, phenology_tiles, FeatureStack, GeoTiffStack, MonthlySeries, PhenologyBands,
    PhenologyParams, PixelPhenology, ProcessingOptions, TimeSeriesSource, DEFAULT_PEAK_TOLERANCE,
    DEFAULT_THRESHOLD_FRACTION, MONTHS,
};
use verdant_core::io::{read_geotiff, write_geotiff};
use verdant_core::Raster;
use verdant_parallel::{ProcessingMode, TileIterator};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "verdant")]
#[command(author, version, about = "Growing-season phenology from monthly vegetation index composites", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Compute phenology for a single series typed on the command line
    Pixel {
        /// Twelve monthly values, January first; `nan` or `-` marks a missing month
        #[arg(num_args = MONTHS, allow_hyphen_values = true, required = true)]
        values: Vec<String>,
        /// Fraction of the annual maximum that opens the season
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD_FRACTION)]
        threshold_fraction: f64,
        /// Tolerance when matching the peak value
        #[arg(short, long, default_value_t = DEFAULT_PEAK_TOLERANCE)]
        peak_tolerance: f64,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute the phenology bands of twelve monthly rasters
    Phenology(PhenologyArgs),
}

#[derive(Args)]
struct PhenologyArgs {
    /// Monthly index rasters, January first
    #[arg(short, long, num_args = MONTHS, required = true)]
    months: Vec<PathBuf>,
    /// Directory for the output bands
    #[arg(short, long)]
    output_dir: PathBuf,
    /// Fraction of the annual maximum that opens the season
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD_FRACTION)]
    threshold_fraction: f64,
    /// Tolerance when matching the peak value
    #[arg(short, long, default_value_t = DEFAULT_PEAK_TOLERANCE)]
    peak_tolerance: f64,
    /// Vegetation index name used in output file names
    #[arg(short, long, default_value = "NDVI")]
    index: String,
    /// Analysis year used in output file names
    #[arg(short, long)]
    year: Option<i32>,
    /// Tile edge length in pixels
    #[arg(long, default_value = "512")]
    tile_size: usize,
    /// Worker threads (default: all cores)
    #[arg(long)]
    threads: Option<usize>,
    /// No-data value of the monthly rasters, overriding their own tags
    #[arg(long, allow_hyphen_values = true)]
    nodata: Option<f64>,
    /// Extra band written alongside, as NAME=PATH (repeatable)
    #[arg(long = "extra", value_name = "NAME=PATH")]
    extras: Vec<String>,
    /// Comma-separated bands to write, in order (default: all)
    #[arg(long, value_delimiter = ',')]
    select: Vec<String>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn tile_progress(tiles: u64) -> ProgressBar {
    let pb = ProgressBar::new(tiles);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tiles ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    read_geotiff(path).with_context(|| format!("Failed to read raster {}", path.display()))
}

fn open_months(paths: &[PathBuf], nodata: Option<f64>) -> Result<GeoTiffStack> {
    let stack = GeoTiffStack::open(paths)
        .context("Monthly rasters do not form a stack")?
        .with_nodata(nodata);
    for (month, path) in (1u8..).zip(paths) {
        if let Some(reader) = stack.month(month) {
            debug!("{}: month {}, nodata {:?}", path.display(), month, reader.nodata());
        }
    }

    let (rows, cols) = stack.shape();
    info!("Input: {} x {} ({} months)", cols, rows, MONTHS);
    Ok(stack)
}

fn write_band(raster: &Raster<f64>, path: &Path) -> Result<()> {
    write_geotiff(raster, path, None)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_month_value(s: &str) -> Result<Option<f64>> {
    match s.trim().to_lowercase().as_str() {
        "nan" | "-" | "" => Ok(None),
        v => v
            .parse::<f64>()
            .map(Some)
            .with_context(|| format!("Invalid monthly value: {}", s)),
    }
}

fn parse_extra(s: &str) -> Result<(String, PathBuf)> {
    match s.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => anyhow::bail!("Extra band must be NAME=PATH, got: {}", s),
    }
}

fn processing_mode(threads: Option<usize>) -> ProcessingMode {
    match threads {
        Some(1) => ProcessingMode::Sequential,
        Some(n) => ProcessingMode::ParallelWith(n),
        None => ProcessingMode::Parallel,
    }
}

fn compute_bands(
    source: &dyn TimeSeriesSource,
    params: &PhenologyParams,
    options: &ProcessingOptions,
) -> Result<PhenologyBands> {
    let (rows, cols) = source.shape();
    let pb = tile_progress(TileIterator::new(rows, cols, options.tile_size).count() as u64);

    let mut bands = PhenologyBands::for_source(source);
    phenology_tiles(source, params, options, |tile, pixels| {
        bands.write_tile(&tile, &pixels)?;
        pb.inc(1);
        Ok(())
    })
    .context("Phenology extraction failed")?;
    pb.finish_and_clear();

    Ok(bands)
}

/// Compute, stack and write the phenology bands; returns the written files in order
fn run_phenology(args: &PhenologyArgs) -> Result<Vec<PathBuf>> {
    let params = PhenologyParams {
        index_name: args.index.clone(),
        year: args.year,
        threshold_fraction: args.threshold_fraction,
        peak_tolerance: args.peak_tolerance,
    };
    params.validate()?;
    let options = ProcessingOptions {
        tile_size: args.tile_size,
        batch_tiles: None,
        mode: processing_mode(args.threads),
    };
    let extras = args
        .extras
        .iter()
        .map(|e| parse_extra(e))
        .collect::<Result<Vec<_>>>()?;

    let source = open_months(&args.months, args.nodata)?;

    let start = Instant::now();
    let bands = compute_bands(&source, &params, &options)?;
    let elapsed = start.elapsed();

    let summary = bands.summary();
    info!(
        "{}: {} pixels with a season, {} with an empty season, {} without data",
        params.label(),
        summary.season,
        summary.empty_season,
        summary.no_data
    );

    let mut features = FeatureStack::from_phenology(bands);
    for (name, path) in &extras {
        let raster = read_raster(path)?;
        features
            .push_band(name.as_str(), raster)
            .with_context(|| format!("Cannot add extra band {}", name))?;
    }
    if !args.select.is_empty() {
        features = features
            .select(args.select.as_slice())
            .context("Invalid band selection")?;
    }

    let output_dir = &args.output_dir;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Cannot create {}", output_dir.display()))?;
    let prefix = params.label().replace(' ', "_");

    let pb = spinner("Writing output...");
    let mut written = Vec::with_capacity(features.len());
    for (name, raster) in features.iter() {
        let path = output_dir.join(format!("{}_{}.tif", prefix, name));
        write_band(raster, &path)?;
        written.push(path);
    }
    pb.finish_and_clear();

    done(
        &format!("{} phenology ({} bands)", params.label(), features.len()),
        output_dir,
        elapsed,
    );
    Ok(written)
}

fn print_pixel(px: &PixelPhenology, json: bool) -> Result<()> {
    let status = format!("{:?}", px.status());
    let features = px.features();

    if json {
        let out = serde_json::json!({
            "status": status,
            "features": features,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Status: {}", status);
    for (field, value) in features.iter() {
        if field.is_month() {
            println!("  {:<16} {}", field, value as u8);
        } else {
            println!("  {:<16} {:.6}", field, value);
        }
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let raster = read_raster(&input)?;
            pb.finish_and_clear();

            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let gt = raster.transform();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Pixel size: {} x {}", gt.pixel_width, gt.pixel_height);
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Pixel ────────────────────────────────────────────────────
        Commands::Pixel {
            values,
            threshold_fraction,
            peak_tolerance,
            json,
        } => {
            let parsed = values
                .iter()
                .map(|v| parse_month_value(v))
                .collect::<Result<Vec<_>>>()?;
            if parsed.len() != MONTHS {
                anyhow::bail!("Expected {} monthly values, got {}", MONTHS, parsed.len());
            }
            let mut slots = [None; MONTHS];
            slots.copy_from_slice(&parsed);

            let params = PhenologyParams {
                threshold_fraction,
                peak_tolerance,
                ..Default::default()
            };
            params.validate()?;

            let px = phenology_pixel(&MonthlySeries::from_options(slots), &params);
            print_pixel(&px, json)?;
        }

        // ── Phenology ────────────────────────────────────────────────
        Commands::Phenology(args) => {
            run_phenology(&args)?;
        }
    }

    Ok(())
}
