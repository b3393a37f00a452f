use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::catalog::Catalog;
use crate::config::GeneratorConfig;
use crate::manifest::Manifest;
use crate::models::*;
use crate::writer::{read_corpus, write_corpus_to_path};

/// Helper: load a YAML config, generate, write and read the corpus back
fn run(dir: &Path, yaml: &str) -> (GeneratorConfig, Manifest, Vec<LogRecord>) {
    let config_path = dir.join("corpus.yml");
    fs::write(&config_path, yaml).unwrap();
    let config = GeneratorConfig::load(&config_path).unwrap();

    let catalog = Catalog::new(config.clone()).unwrap();
    let corpus = catalog.generate();
    let output = dir.join(config.profile.default_output());
    let written = write_corpus_to_path(&output, &corpus, config.include_header()).unwrap();

    let manifest = Manifest::from_corpus(&corpus, config.include_header());
    assert_eq!(written, manifest.total_records);

    let records = read_corpus(&output, config.include_header()).unwrap();
    (config, manifest, records)
}

fn rows<'a>(records: &'a [LogRecord], manifest: &Manifest, scenario: Scenario) -> &'a [LogRecord] {
    let block = manifest.block(scenario).unwrap();
    &records[block.first_row..block.first_row + block.records]
}

fn column_values<'a>(records: &'a [LogRecord], position: usize) -> BTreeSet<&'a str> {
    records.iter().filter_map(|r| r.get(position)).collect()
}

#[test]
fn test_end_to_end_randomized_corpus() {
    let temp_dir = TempDir::new().unwrap();
    let (_, manifest, records) = run(temp_dir.path(), "profile: randomized\nseed: 2024\n");

    assert_eq!(records.len(), 220);
    assert_eq!(records.len(), manifest.total_records);
    assert!(temp_dir.path().join("correct_format_logs.csv").exists());

    // Every anomaly block keeps the signature a detector looks for
    let spike = rows(&records, &manifest, Scenario::TimeSpike);
    let first = spike[0].timestamp().unwrap();
    let last = spike[spike.len() - 1].timestamp().unwrap();
    assert!((last - first).num_seconds() < 60);

    let errors = rows(&records, &manifest, Scenario::HighErrorRate);
    let failing = errors
        .iter()
        .filter(|r| r.get(column::STATUS).unwrap().starts_with('4'))
        .count();
    assert!(failing * 10 >= errors.len() * 8);

    let geo = rows(&records, &manifest, Scenario::GeographicDispersion);
    assert_eq!(column_values(geo, column::CLIENT_IP).len(), geo.len());

    let bandwidth = rows(&records, &manifest, Scenario::HighBandwidth);
    assert_eq!(column_values(bandwidth, column::CLIENT_IP).len(), 1);

    let tls = rows(&records, &manifest, Scenario::LegacyTls);
    for version in column_values(tls, column::FILE_NAME) {
        assert!(TlsVersion::LEGACY.iter().any(|v| v.as_str() == version));
    }
}

#[test]
fn test_end_to_end_comprehensive_corpus() {
    let temp_dir = TempDir::new().unwrap();
    let (config, manifest, records) = run(temp_dir.path(), "profile: comprehensive\n");

    assert!(config.include_header());
    assert_eq!(records.len(), 66);

    let content = fs::read_to_string(temp_dir.path().join("comprehensive_test_logs.csv")).unwrap();
    assert!(content.starts_with("timestamp,login,department,company,"));
    assert_eq!(content.lines().count(), 67);

    let files = rows(&records, &manifest, Scenario::SuspiciousFileType);
    let types: Vec<&str> = files.iter().map(|r| r.get(column::FILE_TYPE).unwrap()).collect();
    assert_eq!(types, vec!["exe", "bat", "dll", "zip", "ps1"]);

    // Baseline first, then the anomaly blocks in catalog order
    let order: Vec<Scenario> = manifest.blocks.iter().map(|b| b.scenario).collect();
    assert_eq!(order, Scenario::ALL.to_vec());
    assert_eq!(records[0].get(column::LOGIN), Some("it-acme-corp"));
}

#[test]
fn test_end_to_end_seed_is_reproducible() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let yaml = "profile: randomized\nseed: 99\ncounts:\n  time-spike: 120\n";

    let (_, first_manifest, _) = run(first_dir.path(), yaml);
    let (_, second_manifest, _) = run(second_dir.path(), yaml);
    assert_eq!(first_manifest, second_manifest);

    let first = fs::read(first_dir.path().join("correct_format_logs.csv")).unwrap();
    let second = fs::read(second_dir.path().join("correct_format_logs.csv")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_end_to_end_selected_scenarios_with_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let yaml = r#"
profile: randomized
seed: 5
include_header: true
scenarios: [high-bandwidth, suspicious-user-agent]
scanner_agents: [nikto/2.1.6]
counts:
  suspicious-user-agent: 8
"#;
    let (_, manifest, records) = run(temp_dir.path(), yaml);

    assert_eq!(records.len(), 28);
    assert!(manifest.block(Scenario::Baseline).is_none());

    let agents = rows(&records, &manifest, Scenario::SuspiciousUserAgent);
    assert_eq!(column_values(agents, column::USER_AGENT).into_iter().collect::<Vec<_>>(), vec!["nikto/2.1.6"]);

    let manifest_path = temp_dir.path().join("manifest.json");
    manifest.write_json(&manifest_path).unwrap();
    let loaded = Manifest::load(&manifest_path).unwrap();
    assert_eq!(loaded.seed, Some(5));
    assert!(loaded.header);
    assert_eq!(loaded.block(Scenario::HighBandwidth).unwrap().first_row, 8);
}

#[test]
fn test_end_to_end_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("corpus.yml");
    fs::write(&config_path, "file_extensions: [\"tar.gz\"]\n").unwrap();

    let config = GeneratorConfig::load(&config_path).unwrap();
    let err = Catalog::new(config).err().unwrap();
    assert!(err.to_string().contains("tar.gz"));
}
