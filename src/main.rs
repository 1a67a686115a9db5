//! ocr-bridge - recognize text in an image from the command line
//!
//! Runs the same pipeline the C boundary uses and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ocr_bridge::config::{self, BridgeConfig};
use ocr_bridge::geometry::CoordinateUnits;
use ocr_bridge::vision::{self, OracleBackend};
use ocr_bridge::{OcrPipeline, RecognitionResult};

/// ocr-bridge - text recognition with positions
#[derive(Parser, Debug)]
#[command(name = "ocr-bridge")]
#[command(about = "Recognize text in an image and print it in reading order")]
struct Args {
    /// Image file to recognize
    #[arg(required_unless_present = "list_languages")]
    image: Option<PathBuf>,

    /// Print only the recognized text
    #[arg(long)]
    text_only: bool,

    /// Save the positioned result as JSON to this file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// OCR backend to use instead of the configured one
    #[arg(long, value_enum)]
    backend: Option<OracleBackend>,

    /// Report coordinates in pixels instead of normalized units
    #[arg(long)]
    pixels: bool,

    /// List the native engine's recognizer languages and exit
    #[arg(long)]
    list_languages: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.list_languages {
        println!("Available OCR languages:");
        for language in vision::available_languages()? {
            println!("  {}", language);
        }
        return Ok(());
    }

    let image = args
        .image
        .clone()
        .context("an image path is required")?;

    let config = build_config(&args)?;
    let pipeline = OcrPipeline::from_config(&config)?;

    info!("Processing image: {:?}", image);

    let result = pipeline.recognize(&image)?;
    if args.text_only {
        println!("{}", result.full_text());
    } else {
        print_result(&result, pipeline.normalizer().target().units);
    }

    if let Some(save_path) = &args.save {
        std::fs::write(save_path, result.to_json(true)?)
            .with_context(|| format!("Failed to save result to {:?}", save_path))?;
        println!("\nResult saved to: {}", save_path.display());
    }

    Ok(())
}

/// Load the configuration and apply command-line overrides
fn build_config(args: &Args) -> Result<BridgeConfig> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => config::load_or_default(),
    };

    if let Some(backend) = args.backend {
        config.engine.backend = backend;
    }
    if args.pixels {
        config.layout.units = CoordinateUnits::Pixels;
    }

    Ok(config)
}

fn print_result(result: &RecognitionResult, units: CoordinateUnits) {
    println!("Found {} text items:", result.len());
    for (index, obs) in result.observations().iter().enumerate() {
        let b = &obs.bounding_box;
        println!("[{}] {}", index + 1, obs.text);
        match units {
            CoordinateUnits::Pixels => println!(
                "    position: x={:.0}, y={:.0}, width={:.0}, height={:.0}",
                b.x, b.y, b.width, b.height
            ),
            CoordinateUnits::Normalized => println!(
                "    position: x={:.4}, y={:.4}, width={:.4}, height={:.4}",
                b.x, b.y, b.width, b.height
            ),
        }
        println!("    confidence: {:.1}%", obs.confidence * 100.0);
    }
}
