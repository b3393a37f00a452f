use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use anomaly_corpus::catalog::Catalog;
use anomaly_corpus::config::{parse_count_override, GeneratorConfig, Profile};
use anomaly_corpus::manifest::Manifest;
use anomaly_corpus::models::Scenario;
use anomaly_corpus::writer::write_corpus_to_path;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate labeled proxy log corpora for anomaly detection testing", long_about = None)]
struct Args {
    /// Generator profile: comprehensive or randomized
    #[arg(short, long)]
    profile: Option<Profile>,

    /// Output CSV path (defaults to the profile's file name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for random number generator (for reproducibility)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write a header row naming each column
    #[arg(long, conflicts_with = "no_header")]
    header: bool,

    /// Omit the header row
    #[arg(long)]
    no_header: bool,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Record count override, e.g. time-spike=40 (repeatable)
    #[arg(long = "count", value_parser = parse_count_arg)]
    counts: Vec<(Scenario, usize)>,

    /// Only generate these scenarios (repeatable)
    #[arg(long = "only")]
    only: Vec<Scenario>,

    /// Write a JSON manifest labeling every block
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_count_arg(value: &str) -> Result<(Scenario, usize), String> {
    parse_count_override(value).map_err(|e| e.to_string())
}

/// Merge the optional YAML file with command-line overrides
fn build_config(args: &Args) -> Result<GeneratorConfig> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };

    if let Some(profile) = args.profile {
        config.profile = profile;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.header {
        config.include_header = Some(true);
    }
    if args.no_header {
        config.include_header = Some(false);
    }
    for (scenario, count) in &args.counts {
        config.counts.insert(*scenario, *count);
    }
    if !args.only.is_empty() {
        config.scenarios = Some(args.only.clone());
    }

    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    let config = build_config(&args)?;
    let catalog = Catalog::new(config).context("Invalid generator configuration")?;
    let config = catalog.config();

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(config.profile.default_output()));
    let include_header = config.include_header();

    println!("╔══════════════════════════════════════════╗");
    println!("║   Anomaly Corpus Generator               ║");
    println!("╚══════════════════════════════════════════╝");
    println!();

    info!("Output: {:?}", output);
    let corpus = catalog.generate();
    write_corpus_to_path(&output, &corpus, include_header)?;

    let manifest = Manifest::from_corpus(&corpus, include_header);
    if let Some(path) = &args.manifest {
        manifest.write_json(path)?;
        info!("Wrote manifest to {:?}", path);
    }

    println!("{}", manifest);
    println!("Output file: {}", output.display());
    if let Some(path) = &args.manifest {
        println!("Manifest: {}", path.display());
    }

    Ok(())
}
