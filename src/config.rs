use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::models::Scenario;

/// Scanner and tooling user agents flagged by the detector
pub const DEFAULT_SCANNER_AGENTS: &[&str] = &[
    "sqlmap/1.0",
    "nikto/2.1.6",
    "nmap/7.80",
    "metasploit/6.0.0",
    "wget/1.20.3",
    "curl/7.68.0",
    "python-requests/2.25.1",
];

const COMPREHENSIVE_EXTENSIONS: &[&str] = &["exe", "bat", "dll", "zip", "ps1"];

const RANDOMIZED_EXTENSIONS: &[&str] = &[
    "exe", "dll", "bat", "cmd", "ps1", "vbs", "js", "jar", "zip", "rar",
];

/// How a block picks values out of its pools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Record `i` takes item `i % len`; no randomness at all
    Cyclic,
    /// Seeded random draws
    Random,
}

/// Generator variant: counts, timing, sampling and header defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Small deterministic corpus with a header row
    #[default]
    Comprehensive,
    /// Larger seeded-random corpus without a header row
    Randomized,
}

impl Profile {
    pub fn name(&self) -> &'static str {
        match self {
            Profile::Comprehensive => "comprehensive",
            Profile::Randomized => "randomized",
        }
    }

    pub fn sampling(&self) -> Sampling {
        match self {
            Profile::Comprehensive => Sampling::Cyclic,
            Profile::Randomized => Sampling::Random,
        }
    }

    pub fn default_header(&self) -> bool {
        matches!(self, Profile::Comprehensive)
    }

    pub fn default_output(&self) -> &'static str {
        match self {
            Profile::Comprehensive => "comprehensive_test_logs.csv",
            Profile::Randomized => "correct_format_logs.csv",
        }
    }

    pub fn default_extensions(&self) -> &'static [&'static str] {
        match self {
            Profile::Comprehensive => COMPREHENSIVE_EXTENSIONS,
            Profile::Randomized => RANDOMIZED_EXTENSIONS,
        }
    }

    pub fn default_count(&self, scenario: Scenario) -> usize {
        use Scenario::*;
        match (self, scenario) {
            (Profile::Comprehensive, Baseline) => 10,
            (Profile::Comprehensive, RepeatedUrl) => 5,
            (Profile::Comprehensive, SuspiciousUserAgent) => 5,
            (Profile::Comprehensive, GeographicDispersion) => 5,
            (Profile::Comprehensive, TimeSpike) => 15,
            (Profile::Comprehensive, HighErrorRate) => 10,
            (Profile::Comprehensive, SuspiciousFileType) => 5,
            (Profile::Comprehensive, LegacyTls) => 6,
            (Profile::Comprehensive, HighBandwidth) => 5,
            (Profile::Randomized, Baseline) => 50,
            (Profile::Randomized, RepeatedUrl) => 20,
            (Profile::Randomized, SuspiciousUserAgent) => 15,
            (Profile::Randomized, GeographicDispersion) => 25,
            (Profile::Randomized, TimeSpike) => 30,
            (Profile::Randomized, HighErrorRate) => 25,
            (Profile::Randomized, SuspiciousFileType) => 15,
            (Profile::Randomized, LegacyTls) => 20,
            (Profile::Randomized, HighBandwidth) => 20,
        }
    }

    /// Seconds between consecutive records of a block
    pub fn step_secs(&self, scenario: Scenario) -> i64 {
        match (self, scenario) {
            (Profile::Comprehensive, Scenario::Baseline) => 60,
            (Profile::Randomized, Scenario::Baseline) => 2,
            _ => 1,
        }
    }

    /// First timestamp of a block, relative to the corpus base time
    pub fn block_start(&self, base: NaiveDateTime, scenario: Scenario) -> NaiveDateTime {
        use Scenario::*;
        match self {
            Profile::Comprehensive => {
                let morning = |minute: u32| {
                    let time = NaiveTime::from_hms_opt(10, minute, 0).unwrap_or(base.time());
                    base.date().and_time(time)
                };
                match scenario {
                    Baseline => base,
                    RepeatedUrl => base + Duration::seconds(600),
                    SuspiciousUserAgent => base + Duration::seconds(660),
                    GeographicDispersion => base + Duration::seconds(720),
                    TimeSpike => morning(0),
                    HighErrorRate => morning(1),
                    SuspiciousFileType => morning(2),
                    LegacyTls => morning(3),
                    HighBandwidth => morning(4),
                }
            }
            Profile::Randomized => {
                let offset = match scenario {
                    Baseline => 0,
                    RepeatedUrl => 100,
                    SuspiciousUserAgent => 120,
                    GeographicDispersion => 140,
                    TimeSpike => 180,
                    LegacyTls => 220,
                    SuspiciousFileType => 250,
                    HighErrorRate => 280,
                    HighBandwidth => 320,
                };
                base + Duration::seconds(offset)
            }
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "comprehensive" => Ok(Profile::Comprehensive),
            "randomized" | "random" => Ok(Profile::Randomized),
            _ => bail!("Unknown profile {:?} (expected comprehensive or randomized)", s),
        }
    }
}

/// Monday 2024-01-15 08:00:00, where every corpus starts unless configured
pub fn default_base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|date| date.and_hms_opt(8, 0, 0))
        .unwrap_or_default()
}

/// Generator configuration.
///
/// Every field is optional in YAML; unset fields fall back to the
/// profile's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub profile: Profile,
    pub seed: Option<u64>,
    pub include_header: Option<bool>,
    pub base_time: Option<NaiveDateTime>,
    /// Per-scenario record count overrides
    pub counts: BTreeMap<Scenario, usize>,
    /// Scenarios to emit; all of them when unset
    pub scenarios: Option<Vec<Scenario>>,
    pub file_extensions: Option<Vec<String>>,
    pub scanner_agents: Option<Vec<String>>,
}

impl GeneratorConfig {
    pub fn new(profile: Profile) -> Self {
        GeneratorConfig {
            profile,
            ..Default::default()
        }
    }

    /// Load a configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse YAML in config file: {:?}", path))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn include_header(&self) -> bool {
        self.include_header
            .unwrap_or_else(|| self.profile.default_header())
    }

    pub fn base_time(&self) -> NaiveDateTime {
        self.base_time.unwrap_or_else(default_base_time)
    }

    pub fn count(&self, scenario: Scenario) -> usize {
        self.counts
            .get(&scenario)
            .copied()
            .unwrap_or_else(|| self.profile.default_count(scenario))
    }

    /// Selected scenarios in catalog order, without duplicates
    pub fn scenarios(&self) -> Vec<Scenario> {
        match &self.scenarios {
            Some(selected) => Scenario::ALL
                .into_iter()
                .filter(|scenario| selected.contains(scenario))
                .collect(),
            None => Scenario::ALL.to_vec(),
        }
    }

    pub fn is_selected(&self, scenario: Scenario) -> bool {
        self.scenarios
            .as_ref()
            .map_or(true, |selected| selected.contains(&scenario))
    }

    pub fn file_extensions(&self) -> Vec<String> {
        match &self.file_extensions {
            Some(extensions) => extensions.clone(),
            None => to_owned(self.profile.default_extensions()),
        }
    }

    pub fn scanner_agents(&self) -> Vec<String> {
        match &self.scanner_agents {
            Some(agents) => agents.clone(),
            None => to_owned(DEFAULT_SCANNER_AGENTS),
        }
    }

    /// Reject configurations the catalog cannot satisfy
    pub fn validate(&self) -> Result<()> {
        if self.scenarios().is_empty() {
            bail!("No scenarios selected");
        }

        if self.emits(Scenario::SuspiciousFileType) {
            let extensions = self.file_extensions();
            if extensions.is_empty() {
                bail!("file_extensions must not be empty when suspicious-file-type is generated");
            }
            for extension in &extensions {
                if extension.is_empty()
                    || !extension.chars().all(|c| c.is_ascii_alphanumeric())
                {
                    bail!("Invalid file extension {:?}: expected letters and digits only", extension);
                }
            }
        }

        if self.emits(Scenario::SuspiciousUserAgent) {
            let agents = self.scanner_agents();
            if agents.is_empty() {
                bail!("scanner_agents must not be empty when suspicious-user-agent is generated");
            }
            if agents.iter().any(|agent| agent.trim().is_empty()) {
                bail!("scanner_agents must not contain blank entries");
            }
        }

        Ok(())
    }

    fn emits(&self, scenario: Scenario) -> bool {
        self.is_selected(scenario) && self.count(scenario) > 0
    }
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Parse a `scenario=count` override as given on the command line
pub fn parse_count_override(value: &str) -> Result<(Scenario, usize)> {
    let (name, count) = value
        .split_once('=')
        .with_context(|| format!("Invalid count override {:?}: expected scenario=N", value))?;

    let scenario: Scenario = name.parse()?;
    let count: usize = count
        .trim()
        .parse()
        .with_context(|| format!("Invalid record count in {:?}", value))?;

    Ok((scenario, count))
}
