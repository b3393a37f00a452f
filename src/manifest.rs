use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::catalog::Corpus;
use crate::config::Profile;
use crate::models::{column, Scenario};

/// Where one scenario block sits in the written corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLabel {
    pub scenario: Scenario,
    pub rule: String,
    /// Zero-based index of the block's first data row (header excluded)
    pub first_row: usize,
    pub records: usize,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
}

/// Labels for a generated corpus, written next to the CSV so a detector
/// run can be scored against known-positive blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub profile: Profile,
    /// `None` for cyclic profiles, which draw nothing at random
    pub seed: Option<u64>,
    pub header: bool,
    pub total_records: usize,
    pub blocks: Vec<BlockLabel>,
}

impl Manifest {
    pub fn from_corpus(corpus: &Corpus, header: bool) -> Self {
        let mut first_row = 0;
        let blocks = corpus
            .blocks
            .iter()
            .map(|block| {
                let timestamp_at = |index: usize| {
                    block
                        .records
                        .get(index)
                        .and_then(|record| record.get(column::TIMESTAMP))
                        .map(str::to_string)
                };
                let label = BlockLabel {
                    scenario: block.scenario,
                    rule: block.scenario.description().to_string(),
                    first_row,
                    records: block.len(),
                    first_timestamp: timestamp_at(0),
                    last_timestamp: block.len().checked_sub(1).and_then(timestamp_at),
                };
                first_row += block.len();
                label
            })
            .collect();

        Manifest {
            profile: corpus.profile,
            seed: corpus.seed,
            header,
            total_records: corpus.len(),
            blocks,
        }
    }

    pub fn block(&self, scenario: Scenario) -> Option<&BlockLabel> {
        self.blocks.iter().find(|block| block.scenario == scenario)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize manifest")
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json).with_context(|| format!("Failed to write manifest: {:?}", path))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest: {:?}", path))
    }
}

/// Human-readable run summary: record count and scenario list
impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Generated {} log entries", self.total_records)?;
        writeln!(f, "  Profile: {}", self.profile)?;
        match self.seed {
            Some(seed) => writeln!(f, "  Seed: {}", seed)?,
            None => writeln!(f, "  Seed: not used (cyclic sampling)")?,
        }
        writeln!(f, "  Header row: {}", if self.header { "yes" } else { "no" })?;

        let anomalies: Vec<&BlockLabel> = self
            .blocks
            .iter()
            .filter(|block| block.scenario.is_anomaly())
            .collect();

        if let Some(baseline) = self.block(Scenario::Baseline) {
            writeln!(f, "  Baseline: {} entries", baseline.records)?;
        }

        writeln!(f, "Anomaly scenarios included ({}):", anomalies.len())?;
        for (i, block) in anomalies.iter().enumerate() {
            writeln!(
                f,
                "  {}. {} [{}]: {} entries",
                i + 1,
                block.rule,
                block.scenario,
                block.records
            )?;
        }

        Ok(())
    }
}
