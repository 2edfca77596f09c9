//! Query server for reverse geocoding.
//!
//! Loads the locality dataset into memory and answers point lookups over
//! HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use locus::api::{build_router, validate_point, AppState};
use locus::config::Config;
use locus::dataset::DatasetLoader;
use locus::ReverseService;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Reverse geocoding query server")]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding locality records
    #[arg(long)]
    locality_dir: Option<PathBuf>,

    /// Directory holding locality area records
    #[arg(long)]
    area_dir: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Resolve this point once at startup and log the result ("lng,lat")
    #[arg(long)]
    probe: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
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
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    info!("Locus Query Server");

    let service = DatasetLoader::new()
        .with_progress(true)
        .load_service(
            &config.dataset.locality_dir,
            &config.dataset.locality_area_dir,
        )
        .context("Failed to load dataset")?;

    info!(
        "Serving {} localities and {} area polygons",
        service.catalog().len(),
        service.store().len()
    );

    if let Some(probe) = args.probe.as_deref() {
        run_probe(&service, probe, config.query.nearby_radius)?;
    }

    let state = Arc::new(AppState::new(service, config.query.nearby_radius));
    let app = build_router(state);

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log what a point resolves to and what lies near it
fn run_probe(service: &ReverseService, probe: &str, radius: f64) -> Result<()> {
    let (lng, lat) = probe
        .split_once(',')
        .context("--probe expects \"lng,lat\"")?;
    let lng: f64 = lng.trim().parse().context("Invalid probe longitude")?;
    let lat: f64 = lat.trim().parse().context("Invalid probe latitude")?;
    let point = validate_point(lng, lat).map_err(|e| anyhow::anyhow!("{}", e))?;

    let resolved = service.resolve(point);
    if resolved.is_empty() {
        warn!("Probe ({}, {}) is not inside any locality", lng, lat);
    }
    for locality in &resolved {
        info!(
            "Probe ({}, {}): {} {} {}",
            lng,
            lat,
            locality
                .locality_type
                .map(|t| t.as_str())
                .unwrap_or("unknown"),
            locality.id,
            locality.primary_name().unwrap_or("")
        );
    }

    let nearby = service.nearby(point, radius);
    info!("Probe ({}, {}): {} localities within {}°", lng, lat, nearby.len(), radius);
    for locality in nearby {
        info!("  {}", locality.primary_name().unwrap_or(&locality.id));
    }

    Ok(())
}
