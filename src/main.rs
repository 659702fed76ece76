use anyhow::{Context, Result};
use clap::Parser;
use log::error;
use rfshot::{CaptureConfig, ScreenshotRequest};
use std::path::{Path, PathBuf};

/// Take a screenshot of a web page through a headless browser engine
#[derive(Parser, Debug)]
#[command(name = "rfshot", version, about)]
struct Cli {
    /// Page to capture
    url: String,

    /// Output file (.png, .jpg or .jpeg)
    output: PathBuf,

    /// JSON file with default capture settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine executable (defaults to $RFSHOT_ENGINE, then phantomjs on PATH)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Viewport height in pixels; 0 renders the whole page
    #[arg(long, conflicts_with = "full_page")]
    height: Option<u32>,

    /// Render the whole page instead of a fixed height
    #[arg(long)]
    full_page: bool,

    /// JPEG quality, 1 to 100
    #[arg(long)]
    quality: Option<u8>,

    /// CSS background applied to the page body
    #[arg(long)]
    background: Option<String>,

    /// Resource timeout and render delay in milliseconds
    #[arg(long)]
    timeout: Option<u64>,
}

fn load_config(path: &Path) -> Result<CaptureConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn build_request(cli: &Cli) -> Result<ScreenshotRequest> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CaptureConfig::default(),
    };
    let mut request = ScreenshotRequest::from_config(config)?;

    request.set_url(cli.url.as_str())?;
    if let Some(engine) = &cli.engine {
        request.set_engine_path(engine);
    }
    if let Some(width) = cli.width {
        request.set_width(width)?;
    }
    if let Some(height) = cli.height {
        request.set_height(height)?;
    }
    if cli.full_page {
        request.set_height_to_render_whole_page();
    }
    if let Some(quality) = cli.quality {
        request.set_quality(quality)?;
    }
    if let Some(background) = &cli.background {
        request.set_background_color(background.as_str())?;
    }
    if let Some(timeout) = cli.timeout {
        request.set_timeout(timeout)?;
    }
    Ok(request)
}

fn run(cli: &Cli) -> Result<()> {
    let request = build_request(cli)?;
    request
        .save(&cli.output)
        .with_context(|| format!("Failed to capture {}", cli.url))?;
    println!("{}", cli.output.display());
    Ok(())
}

// Printed regardless of RUST_LOG so a failed run is never silent.
fn failure_message(err: &anyhow::Error) -> String {
    format!("rfshot failed: {:#}", err)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        eprintln!("{}", failure_message(&e));
        std::process::exit(1);
    }
}
