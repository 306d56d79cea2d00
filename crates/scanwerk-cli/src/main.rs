// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — command-line front end for the document scan pipeline.
//
// Entry point. Initialises logging, loads the pipeline config, and runs the
// requested subcommand.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use scanwerk_core::error::Result;
use scanwerk_core::{FallbackReason, PipelineConfig, QuadValidation, Quadrilateral, RectifyStrategy};
use scanwerk_document::image::codec;
use scanwerk_document::integrity::raster_digest;
use scanwerk_document::{GradientField, ScanPipeline};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "scanwerk")]
#[command(about = "Detect, rectify, and clean up photographed document pages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on one page image and write the result as PNG.
    Process(ProcessArgs),

    /// Write the binary edge map of an image as a grayscale PNG.
    Edges(EdgesArgs),

    /// Print the default pipeline configuration as JSON.
    Config,
}

#[derive(Debug, Clone, Args)]
struct ProcessArgs {
    /// Path to the input image (PNG, JPEG, ...).
    #[arg(long)]
    input: PathBuf,

    /// Path to write the processed page (PNG).
    #[arg(long)]
    output: PathBuf,

    /// Pipeline configuration file (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the rectification strategy.
    #[arg(long, value_enum)]
    strategy: Option<CliStrategy>,

    /// Reject non-convex or degenerate page boundaries.
    #[arg(long)]
    require_convex: bool,
}

#[derive(Debug, Clone, Args)]
struct EdgesArgs {
    /// Path to the input image.
    #[arg(long)]
    input: PathBuf,

    /// Path to write the edge map (PNG).
    #[arg(long)]
    output: PathBuf,

    /// Gradient magnitude threshold.
    #[arg(long, default_value = "50.0")]
    threshold: f32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStrategy {
    Bilinear,
    Projective,
}

impl From<CliStrategy> for RectifyStrategy {
    fn from(s: CliStrategy) -> Self {
        match s {
            CliStrategy::Bilinear => RectifyStrategy::BilinearPatch,
            CliStrategy::Projective => RectifyStrategy::Projective,
        }
    }
}

/// Machine-readable summary printed to stdout after `process`.
#[derive(Serialize)]
struct ProcessSummary<'a> {
    success: bool,
    rectified: bool,
    enhanced: bool,
    input_size: (u32, u32),
    output_size: (u32, u32),
    quadrilateral: Option<Quadrilateral>,
    reason: Option<FallbackReason>,
    output_sha256: String,
    output: &'a Path,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Process(args) => run_process(&args),
        Commands::Edges(args) => run_edges(&args),
        Commands::Config => print_default_config(),
    };

    if let Err(err) = outcome {
        tracing::error!(error = %err, "scanwerk failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_config(args: &ProcessArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.rectify_strategy = strategy.into();
    }
    if args.require_convex {
        config.quad_validation = QuadValidation::RequireConvex;
    }
    Ok(config)
}

fn run_process(args: &ProcessArgs) -> Result<()> {
    let config = load_config(args)?;
    let raster = codec::open(&args.input)?;

    let result = ScanPipeline::new(config).process(raster);
    codec::save_png(&result.processed, &args.output)?;
    tracing::info!(output = %args.output.display(), "Processed page written");

    let summary = ProcessSummary {
        success: result.success,
        rectified: result.rectified,
        enhanced: result.enhanced,
        input_size: result.original.dimensions(),
        output_size: result.processed.dimensions(),
        quadrilateral: result.quadrilateral,
        reason: result.reason,
        output_sha256: raster_digest(&result.processed),
        output: &args.output,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_edges(args: &EdgesArgs) -> Result<()> {
    let raster = codec::open(&args.input)?;
    let edges = GradientField::new(args.threshold).compute(&raster);
    std::fs::write(&args.output, codec::encode_edges_png(&edges)?)?;
    tracing::info!(
        edge_count = edges.edge_count(),
        output = %args.output.display(),
        "Edge map written"
    );
    Ok(())
}

fn print_default_config() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&PipelineConfig::default())?);
    Ok(())
}
