//! Command-line driver for NVIDA star identification.
//!
//! Subcommands:
//! - `identify`: identify every scene of an input file, one result line per scene
//! - `generate-table`: build the catalog star-pair distance table
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nvida::batch::run_batch;
use nvida::{
    CameraModel, DistanceTable, GenerateTableConfig, Nvida, NvidaConfig, Projection, StarCatalog,
};

/// Lost-in-space star identification by normalized voting
#[derive(Parser, Debug)]
#[command(name = "nvida")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Identify the stars of every scene in a file
    Identify(IdentifyArgs),

    /// Generate the catalog star-pair distance table
    GenerateTable(GenerateTableArgs),
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// Star catalog: Hipparcos hip_main.dat, or a CSV `id,ra_deg,dec_deg,mag` list
    #[arg(short, long)]
    catalog: PathBuf,

    /// Year to propagate Hipparcos proper motions to
    #[arg(long)]
    epoch: Option<f64>,

    /// Spatial index resolution
    #[arg(long, default_value = "16")]
    nside: u32,
}

#[derive(Args, Debug)]
struct IdentifyArgs {
    #[command(flatten)]
    catalog: CatalogArgs,

    /// Distance table (`.rkyv` binary cache or CSV)
    #[arg(short, long)]
    table: PathBuf,

    /// Scene file, one comma-separated `x,y,mag` list per line
    #[arg(short, long)]
    input: PathBuf,

    /// Result file, one line of catalog ids (or -1) per scene
    #[arg(short, long)]
    output: PathBuf,

    /// Lens projection
    #[arg(long, default_value = "rectilinear")]
    projection: Projection,

    /// Horizontal field of view in degrees
    #[arg(long, default_value = "10.0")]
    fov_deg: f64,

    /// Image width in pixels
    #[arg(long, default_value = "1920")]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value = "1440")]
    height: u32,

    /// Initial angular distance tolerance in radians
    #[arg(long, default_value = "0.0003")]
    dist_error: f64,

    /// Initial magnitude tolerance
    #[arg(long, default_value = "0.04")]
    mag_error: f64,

    /// Tolerance growth factor between rounds (applied to both tolerances)
    #[arg(long, default_value = "1.5")]
    mult_factor: f64,

    /// Distinct triangles tried per scene before giving up
    #[arg(long, default_value = "50")]
    max_triangles: usize,

    /// Per-scene timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct GenerateTableArgs {
    #[command(flatten)]
    catalog: CatalogArgs,

    /// Output table (`.rkyv` binary cache or CSV)
    #[arg(short, long)]
    output: PathBuf,

    /// Largest pair separation in degrees; should cover the image diagonal
    #[arg(long, default_value = "12.5")]
    max_distance_deg: f64,

    /// Faintest magnitude included
    #[arg(long, default_value = "6.0")]
    max_magnitude: f64,
}

fn load_catalog(args: &CatalogArgs) -> Result<StarCatalog> {
    StarCatalog::load(&args.catalog, args.nside, args.epoch)
}

fn cmd_identify(args: IdentifyArgs) -> Result<()> {
    ensure!(
        args.fov_deg > 0.0 && args.fov_deg < 360.0,
        "field of view must be in (0, 360) degrees"
    );
    let catalog = load_catalog(&args.catalog)?;
    let table = DistanceTable::load(&args.table)?;
    let camera = CameraModel::from_fov(
        args.projection,
        args.fov_deg.to_radians(),
        (args.width, args.height),
    );
    info!(
        "Camera: {} {}x{}, {:.2}° horizontal FOV",
        args.projection,
        args.width,
        args.height,
        camera.fov_rad().to_degrees()
    );

    let config = NvidaConfig {
        dist_error: args.dist_error,
        mag_error: args.mag_error,
        dist_mult_factor: args.mult_factor,
        mag_mult_factor: args.mult_factor,
        max_num_triangles: args.max_triangles,
        solve_timeout_ms: args.timeout_ms,
        ..Default::default()
    };
    let nvida = Nvida::with_config(&catalog, &table, &camera, config);

    let summary = run_batch(&nvida, &args.input, &args.output)?;
    println!("{summary}");
    Ok(())
}

fn cmd_generate_table(args: GenerateTableArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let config = GenerateTableConfig {
        max_distance_rad: args.max_distance_deg.to_radians(),
        max_magnitude: args.max_magnitude,
    };
    let table = DistanceTable::generate(&catalog, &config);
    table.save(&args.output)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Identify(args) => cmd_identify(args),
        Command::GenerateTable(args) => cmd_generate_table(args),
    }
}
