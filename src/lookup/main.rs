//! One-shot reverse lookup from the command line.
//!
//! Loads the dataset, resolves a single point and prints the result as JSON
//! on stdout.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use locus::api::validate_point;
use locus::config::Config;
use locus::dataset::DatasetLoader;
use locus::BoundaryMode;

#[derive(Parser, Debug)]
#[command(name = "lookup")]
#[command(about = "Resolve a point to its localities")]
struct Args {
    /// Longitude
    #[arg(long, allow_hyphen_values = true)]
    lng: f64,

    /// Latitude
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding locality records
    #[arg(long)]
    locality_dir: Option<PathBuf>,

    /// Directory holding locality area records
    #[arg(long)]
    area_dir: Option<PathBuf>,

    /// Print boundaries instead of plain records
    #[arg(long)]
    debug: bool,

    /// With --debug, print every matched boundary
    #[arg(long)]
    debug_full: bool,

    /// Also log localities whose bbox lies near the point
    #[arg(long)]
    nearby: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(dir) = args.locality_dir {
        config.dataset.locality_dir = dir;
    }
    if let Some(dir) = args.area_dir {
        config.dataset.locality_area_dir = dir;
    }

    let point = validate_point(args.lng, args.lat).map_err(|e| anyhow::anyhow!("{}", e))?;

    let service = DatasetLoader::new()
        .with_progress(true)
        .load_service(
            &config.dataset.locality_dir,
            &config.dataset.locality_area_dir,
        )
        .context("Failed to load dataset")?;

    let json = match BoundaryMode::from_flags(args.debug, args.debug_full) {
        BoundaryMode::Metadata => serde_json::to_string_pretty(&service.resolve(point))?,
        mode => serde_json::to_string_pretty(&service.project(point, mode))?,
    };

    if args.nearby {
        let radius = config.query.nearby_radius;
        for locality in service.nearby(point, radius) {
            info!(
                "Nearby: {} ({})",
                locality.primary_name().unwrap_or(&locality.id),
                locality.id
            );
        }
    }

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;

    Ok(())
}
