use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use trade_ocr::api::trades::{ExtractorOptions, TradeLogExtractor};
use trade_ocr::core::reconstruct::ReconstructConfig;

#[derive(Parser, Debug)]
#[command(name = "trade-ocr")]
#[command(about = "Rebuild a position ledger from a screen recording of a trading table")]
#[command(version)]
struct Cli {
    /// Screen recording to process
    video: PathBuf,

    /// Directory for the staged/corrected CSV and the checkpoint (default: next to the video)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// JSON table layout overriding the built-in screen geometry
    #[arg(long)]
    layout: Option<PathBuf>,

    #[arg(long)]
    tessdata_dir: Option<PathBuf>,

    /// Tesseract binary
    #[arg(long, default_value = "tesseract")]
    tesseract: PathBuf,

    /// Ignore the existing staged ledger and checkpoint
    #[arg(long)]
    fresh: bool,

    /// Stop after this many commits (resume later)
    #[arg(long)]
    max_commits: Option<u64>,

    #[arg(long, default_value_t = 16)]
    max_collision_retries: u32,
}

fn main() -> Result<()> {
    trade_ocr::init_logging();
    let cli = Cli::parse();

    let mut config = if cli.fresh {
        ReconstructConfig::fresh()
    } else {
        ReconstructConfig::default()
    };
    config.max_commits = cli.max_commits;
    config.max_collision_retries = cli.max_collision_retries;

    let options = ExtractorOptions {
        output_dir: cli.output_dir,
        layout: cli.layout,
        tesseract: cli.tesseract,
        tessdata_dir: cli.tessdata_dir,
        config,
    };
    let mut extractor = TradeLogExtractor::create(&cli.video, options)
        .with_context(|| format!("Failed to open {}", cli.video.display()))?;
    let outcome = extractor
        .run()
        .with_context(|| format!("Failed to process {}", cli.video.display()))?;

    if outcome.stopped_early {
        info!("Run again without --fresh to continue");
    }
    if let Some(report) = &outcome.report {
        if !report.is_clean() {
            warn!("{} validation anomalies, check the log above", report.anomalies.len());
        }
    }
    Ok(())
}
