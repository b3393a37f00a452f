// Corpus inspector
//
// Reads a generated corpus back and checks it the way the downstream log
// parser will see it: field count, timestamp format, and the positional
// fields it relies on.
//
// Usage:
//   inspect_corpus -i comprehensive_test_logs.csv --has-header
//   inspect_corpus -i correct_format_logs.csv -m manifest.json

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use anomaly_corpus::manifest::Manifest;
use anomaly_corpus::models::{column, LogRecord, COLUMNS, FIELD_COUNT};
use anomaly_corpus::writer::read_corpus;

#[derive(Parser, Debug)]
#[command(author, version, about = "Validate a generated proxy log corpus", long_about = None)]
struct Args {
    /// Corpus CSV file
    #[arg(short, long)]
    input: PathBuf,

    /// The first line is a header row
    #[arg(long)]
    has_header: bool,

    /// Manifest written alongside the corpus; block boundaries are checked against it
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Positions the downstream parser requires
const CRITICAL_FIELDS: [(usize, &str); 8] = [
    (column::LOGIN, "login"),
    (column::DESTINATION, "destination"),
    (column::DEPARTMENT, "department"),
    (column::CLIENT_IP, "client IP"),
    (column::SERVER_IP, "server IP"),
    (column::METHOD, "request method"),
    (column::STATUS, "response code"),
    (column::USER_AGENT, "user agent"),
];

/// Problems the downstream parser would trip over, one message per record
fn check_record(index: usize, record: &LogRecord) -> Vec<String> {
    let mut problems = Vec::new();

    if let Err(e) = record.timestamp() {
        problems.push(format!("row {}: {}", index, e));
    }
    for position in [column::CLIENT_IP, column::DESTINATION] {
        if record.get(position).map_or(true, str::is_empty) {
            problems.push(format!("row {}: empty {}", index, COLUMNS[position]));
        }
    }

    problems
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Reading corpus {:?}", args.input);
    let records = read_corpus(&args.input, args.has_header)?;

    println!("=== CORPUS CHECK ===");
    println!("Records: {}", records.len());
    println!("Fields per record: {}", FIELD_COUNT);

    if let Some(first) = records.first() {
        println!();
        println!("=== CRITICAL FIELDS (first record) ===");
        for (position, label) in CRITICAL_FIELDS {
            println!(
                "  [{}] {} ({}): {}",
                position,
                label,
                COLUMNS[position],
                first.get(position).unwrap_or_default()
            );
        }
    }

    let problems: Vec<String> = records
        .iter()
        .enumerate()
        .flat_map(|(i, record)| check_record(i, record))
        .collect();

    if let Some(path) = &args.manifest {
        let manifest = Manifest::load(path)?;
        if manifest.total_records != records.len() {
            bail!(
                "Manifest lists {} records but the corpus has {}",
                manifest.total_records,
                records.len()
            );
        }
        if manifest.header != args.has_header {
            warn!("Manifest header flag ({}) differs from --has-header", manifest.header);
        }
        println!();
        print!("{}", manifest);
    }

    println!();
    if !problems.is_empty() {
        for problem in &problems {
            println!("  {}", problem);
        }
        bail!("{} problems found in {:?}", problems.len(), args.input);
    }

    println!("All {} records are valid", records.len());
    Ok(())
}
