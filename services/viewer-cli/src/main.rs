//! Command-line GeoTIFF band viewer.
//!
//! Uploads a raster to the band backend, prints the label of every band and
//! exports the requested bands as PNG files:
//! - `viewer-cli scene.tif` exports band 1
//! - `viewer-cli scene.tif --band 3 --band 2 --output-dir out/`
//! - `viewer-cli scene.tif --list` only prints the band labels

mod app;
mod config;
mod export;

use std::path::PathBuf;

use anyhow::Result;
use band_common::ViewerError;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use app::Job;
use config::{FileConfig, Overrides, Settings};

#[derive(Parser, Debug)]
#[command(name = "viewer-cli")]
#[command(about = "Upload a GeoTIFF and export its bands as images")]
struct Args {
    /// GeoTIFF file to upload (.tif or .tiff)
    file: PathBuf,

    /// Band to display and export (1-based, repeatable; default: 1)
    #[arg(short, long = "band")]
    bands: Vec<u32>,

    /// Directory for exported band images
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Only list the band labels
    #[arg(long)]
    list: bool,

    /// Band backend root URL
    #[arg(long, env = "BAND_API_URL")]
    api_url: Option<String>,

    /// Whole-request timeout in seconds
    #[arg(long, env = "BAND_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    /// YAML config file
    #[arg(short, long, env = "BAND_VIEWER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // Logs go to stderr; stdout carries the band listing.
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(
        file_config,
        Overrides {
            api_url: args.api_url.clone(),
            request_timeout_secs: args.request_timeout_secs,
            output_dir: args.output_dir.clone(),
        },
    );

    let job = Job {
        file: args.file.clone(),
        bands: args.bands.clone(),
        list_only: args.list,
    };

    let report = match app::run(&job, &settings).await {
        Ok(report) => report,
        Err(err) => {
            // Viewer errors carry the text the status area would show.
            if let Some(viewer_err) = err.downcast_ref::<ViewerError>() {
                eprintln!("{}", viewer_err.user_message());
            }
            return Err(err);
        }
    };

    println!("Visor: {}", report.asset);
    for (position, label) in report.labels.iter().enumerate() {
        println!("{:>4}  {}", position + 1, label);
    }
    for exported in &report.exported {
        println!(
            "Mostrando: {} -> {}",
            exported.label,
            exported.path.display()
        );
    }
    for failure in &report.failures {
        eprintln!("{}", failure.message);
    }

    info!(
        exported = report.exported.len(),
        failed = report.failures.len(),
        "Viewer run finished"
    );
    if !report.failures.is_empty() {
        anyhow::bail!("{} band(s) could not be displayed", report.failures.len());
    }
    Ok(())
}
