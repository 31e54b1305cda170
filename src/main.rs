use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use c2rcc_nn::batch::{BatchProcessor, BatchSummary, Observation};
use c2rcc_nn::{AncillaryResolver, InversionPipeline, NetSetId, PipelineConfig};

/// C2RCC neural-net inversion of ocean-colour pixels
#[derive(Parser, Debug)]
#[command(name = "c2rcc-nn")]
#[command(about = "Inverts TOA samples into water-leaving reflectance, IOPs and Kd")]
struct Args {
    /// Run configuration (JSON)
    #[arg(short, long, default_value = "./data/config/meris_config.json")]
    config: PathBuf,

    /// Observations to invert (JSON array)
    #[arg(short, long, default_value = "./data/pixels.json")]
    pixels: PathBuf,

    /// Write per-pixel results to this JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Net directory with one subdirectory per role, replaces the configured net set
    #[arg(long)]
    net_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = PipelineConfig::from_file(&args.config)?;
    if let Some(dir) = args.net_dir {
        config = config.with_net_set(NetSetId::Custom(dir));
    }

    let resolver = AncillaryResolver::new(None, config.ozone(), config.pressure())?;
    let pipeline = InversionPipeline::from_config(config)?;
    for name in pipeline.used_net_names() {
        info!(net = %name, "using net");
    }

    let observations = Observation::from_file(&args.pixels)?;
    let results = BatchProcessor::new(&pipeline, &resolver).run(observations)?;
    let summary = BatchSummary::from_results(&results);

    println!(
        "{} pixels: {} valid, {} without quality flags",
        summary.total, summary.valid, summary.clean
    );
    for (flag, count) in summary.flag_counts.iter().filter(|(_, count)| *count > 0) {
        println!("  {:<14} {:>6}  {}", flag.name(), count, flag.description());
    }

    let valid_chl: Vec<f64> = results
        .iter()
        .map(|r| r.chl)
        .filter(|chl| chl.is_finite())
        .collect();
    if !valid_chl.is_empty() {
        println!(
            "  chl min {:.3}, max {:.3}, mean {:.3} mg m-3",
            valid_chl.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
            valid_chl.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
            valid_chl.iter().sum::<f64>() / valid_chl.len() as f64
        );
    }

    if let Some(path) = args.output {
        serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), &results)?;
        info!(path = %path.display(), "results written");
    }

    Ok(())
}
