use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::Ipv4Addr;
use tracing::{debug, info, warn};

use crate::config::{GeneratorConfig, Profile, Sampling};
use crate::models::{Annotation, LogRecord, Method, ProxyEvent, Scenario, TlsVersion, Verdict};

/// A normal destination and the labels the proxy attaches to it
struct Site {
    destination: &'static str,
    name: &'static str,
    category: &'static str,
    risk_score: u8,
    request_bytes: u64,
    response_bytes: u64,
    url_class: &'static str,
    url_super_category: &'static str,
    url_category: &'static str,
    server_ip: Ipv4Addr,
}

const NORMAL_SITES: [Site; 5] = [
    Site {
        destination: "google.com",
        name: "Google",
        category: "Search Engines",
        risk_score: 15,
        request_bytes: 1024,
        response_bytes: 2048,
        url_class: "General Surfing",
        url_super_category: "Search Engines",
        url_category: "Search",
        server_ip: Ipv4Addr::new(8, 8, 8, 8),
    },
    Site {
        destination: "github.com",
        name: "GitHub",
        category: "Development",
        risk_score: 30,
        request_bytes: 2048,
        response_bytes: 4096,
        url_class: "Technology",
        url_super_category: "Development",
        url_category: "Code Repositories",
        server_ip: Ipv4Addr::new(140, 82, 112, 3),
    },
    Site {
        destination: "stackoverflow.com",
        name: "Stack Overflow",
        category: "Development",
        risk_score: 25,
        request_bytes: 1536,
        response_bytes: 3072,
        url_class: "Technology",
        url_super_category: "Development",
        url_category: "Technical Q&A",
        server_ip: Ipv4Addr::new(151, 101, 1, 69),
    },
    Site {
        destination: "linkedin.com",
        name: "LinkedIn",
        category: "Social Networking",
        risk_score: 20,
        request_bytes: 1024,
        response_bytes: 2048,
        url_class: "Social Networking",
        url_super_category: "Social Networking",
        url_category: "Professional Networking",
        server_ip: Ipv4Addr::new(13, 107, 42, 14),
    },
    Site {
        destination: "office365.com",
        name: "Office 365",
        category: "Productivity",
        risk_score: 25,
        request_bytes: 512,
        response_bytes: 1024,
        url_class: "Office Apps",
        url_super_category: "Productivity",
        url_category: "Office Applications",
        server_ip: Ipv4Addr::new(13, 107, 136, 9),
    },
];

const DEPARTMENTS: [&str; 8] = [
    "IT",
    "HR",
    "Finance",
    "Marketing",
    "Engineering",
    "Sales",
    "Legal",
    "Operations",
];

const COMPANIES: [&str; 3] = ["ACME Corp", "TechStart Inc", "Global Solutions Ltd"];

const BROWSER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
];

const COUNTRIES: [&str; 3] = ["CN", "RU", "NG"];

/// Every record of the geographic block gets its own address counting up from here
const GEO_CLIENT_BASE: Ipv4Addr = Ipv4Addr::new(172, 17, 7, 1);
const GEO_SERVER_BASE: Ipv4Addr = Ipv4Addr::new(203, 208, 60, 1);

/// Records of the time spike all land within this many seconds of the block start
const SPIKE_WINDOW_SECS: usize = 59;

/// Every n-th record of the error block is a healthy response
const HEALTHY_EVERY: usize = 10;

/// A contiguous run of records generated from one scenario
#[derive(Debug, Clone)]
pub struct ScenarioBlock {
    pub scenario: Scenario,
    pub records: Vec<LogRecord>,
}

impl ScenarioBlock {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The complete generated corpus: baseline block first, then anomalies
#[derive(Debug, Clone)]
pub struct Corpus {
    pub profile: Profile,
    /// Seed of the random draws; `None` when the profile samples cyclically
    pub seed: Option<u64>,
    pub blocks: Vec<ScenarioBlock>,
}

impl Corpus {
    /// Total number of records across all blocks
    pub fn len(&self) -> usize {
        self.blocks.iter().map(ScenarioBlock::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> impl Iterator<Item = &LogRecord> {
        self.blocks.iter().flat_map(|block| block.records.iter())
    }

    pub fn block(&self, scenario: Scenario) -> Option<&ScenarioBlock> {
        self.blocks.iter().find(|block| block.scenario == scenario)
    }
}

/// Builds corpora from a validated configuration
pub struct Catalog {
    config: GeneratorConfig,
    seed: Option<u64>,
}

impl Catalog {
    /// Validate the configuration and fix the seed for this run.
    ///
    /// When no seed is configured one is drawn at random, so every corpus
    /// can still be reproduced from its manifest. Cyclic profiles draw
    /// nothing and carry no seed.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let seed = match config.profile.sampling() {
            Sampling::Random => Some(config.seed.unwrap_or_else(rand::random)),
            Sampling::Cyclic => {
                if let Some(seed) = config.seed {
                    warn!("Seed {} ignored: the {} profile is not random", seed, config.profile);
                }
                None
            }
        };
        Ok(Catalog { config, seed })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Generate the corpus with a generator seeded from this catalog's seed
    pub fn generate(&self) -> Corpus {
        let mut rng = StdRng::seed_from_u64(self.seed.unwrap_or_default());
        self.generate_with(&mut rng)
    }

    /// Generate the corpus drawing from a caller-supplied generator
    pub fn generate_with(&self, rng: &mut StdRng) -> Corpus {
        match self.seed {
            Some(seed) => info!("Generating {} corpus (seed {})", self.config.profile, seed),
            None => info!("Generating {} corpus", self.config.profile),
        }

        let blocks = self
            .config
            .scenarios()
            .into_iter()
            .map(|scenario| self.generate_block(scenario, rng))
            .collect();

        Corpus {
            profile: self.config.profile,
            seed: self.seed,
            blocks,
        }
    }

    /// Generate one scenario block
    pub fn generate_block(&self, scenario: Scenario, rng: &mut StdRng) -> ScenarioBlock {
        let profile = self.config.profile;
        let count = self.config.count(scenario);
        let scanner_agents = self.config.scanner_agents();
        let file_extensions = match &self.config.file_extensions {
            Some(list) => ExtensionPool::Configured(list.clone()),
            None => ExtensionPool::Default(self.config.file_extensions()),
        };

        let mut ctx = BlockContext {
            rng,
            sampling: profile.sampling(),
            start: profile.block_start(self.config.base_time(), scenario),
            step_secs: profile.step_secs(scenario),
            count,
        };

        let records: Vec<LogRecord> = (0..count)
            .map(|i| {
                let event = match scenario {
                    Scenario::Baseline => baseline(&mut ctx, i),
                    Scenario::RepeatedUrl => repeated_url(&mut ctx, i),
                    Scenario::SuspiciousUserAgent => {
                        suspicious_user_agent(&mut ctx, i, &scanner_agents)
                    }
                    Scenario::GeographicDispersion => geographic_dispersion(&mut ctx, i),
                    Scenario::TimeSpike => time_spike(&mut ctx, i),
                    Scenario::HighErrorRate => high_error_rate(&mut ctx, i),
                    Scenario::SuspiciousFileType => {
                        suspicious_file_type(&mut ctx, i, &file_extensions)
                    }
                    Scenario::LegacyTls => legacy_tls(&mut ctx, i),
                    Scenario::HighBandwidth => high_bandwidth(&mut ctx, i),
                };
                event.into_record()
            })
            .collect();

        debug!("Generated {} records for {}", records.len(), scenario);

        ScenarioBlock { scenario, records }
    }
}

/// Per-block generation state threaded through every scenario function
struct BlockContext<'a> {
    rng: &'a mut StdRng,
    sampling: Sampling,
    start: NaiveDateTime,
    step_secs: i64,
    count: usize,
}

impl BlockContext<'_> {
    /// Pick an item for record `index`; `pool` must not be empty
    fn pick<'p, T: ?Sized>(&mut self, pool: &'p [&'p T], index: usize) -> &'p T {
        match self.sampling {
            Sampling::Cyclic => pool[index % pool.len()],
            Sampling::Random => pool[self.rng.gen_range(0..pool.len())],
        }
    }

    fn pick_index(&mut self, len: usize, index: usize) -> usize {
        match self.sampling {
            Sampling::Cyclic => index % len,
            Sampling::Random => self.rng.gen_range(0..len),
        }
    }

    fn timestamp(&self, index: usize) -> NaiveDateTime {
        self.start + Duration::seconds(self.step_secs * index as i64)
    }

    /// Fixed per-scenario address when cyclic, a random public one otherwise
    fn server_ip(&mut self, fixed: Ipv4Addr) -> Ipv4Addr {
        match self.sampling {
            Sampling::Cyclic => fixed,
            Sampling::Random => Ipv4Addr::new(
                self.rng.gen_range(1..224),
                self.rng.gen_range(0..=255),
                self.rng.gen_range(0..=255),
                self.rng.gen_range(1..255),
            ),
        }
    }
}

/// Address `index` steps above `base`
fn offset_ip(base: Ipv4Addr, index: usize) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(base).wrapping_add(index as u32))
}

/// `ACME Corp` -> `acme-corp`
fn slug(value: &str) -> String {
    value.to_lowercase().replace(' ', "-")
}

/// Skeleton shared by the anomaly blocks; each scenario overrides what it needs
fn anomaly_event(ctx: &mut BlockContext, index: usize, attacker: u8) -> ProxyEvent {
    ProxyEvent {
        timestamp: ctx.timestamp(index),
        login: format!("attacker{}", attacker),
        protocol: "HTTP",
        destination: String::new(),
        verdict: Verdict::Allowed,
        site_name: String::new(),
        category: "Technology".to_string(),
        risk_score: 45,
        request_bytes: 64,
        response_bytes: 128,
        total_bytes: 192,
        url_class: "Technology".to_string(),
        url_super_category: "Technology".to_string(),
        url_category: String::new(),
        department: "IT Department".to_string(),
        client_ip: Ipv4Addr::new(172, 17, 6, 149 + attacker),
        server_ip: ctx.server_ip(Ipv4Addr::new(192, 168, 1, attacker)),
        method: Method::Get,
        status: 200,
        user_agent: ctx.pick(&BROWSER_AGENTS, index).to_string(),
        rule_label: String::new(),
        annotation: Annotation::None,
    }
}

/// Blocked request; malware destinations carry their own label set
fn blocked(mut event: ProxyEvent, category: &str, url_category: &str) -> ProxyEvent {
    let malware = category == "Malware";
    event.verdict = Verdict::Blocked;
    event.status = 403;
    event.category = category.to_string();
    event.risk_score = if malware { 95 } else { 75 };
    event.request_bytes = 0;
    event.response_bytes = 0;
    event.total_bytes = 0;
    if malware {
        event.url_class = "Security Risk".to_string();
        event.url_super_category = category.to_string();
    } else {
        event.url_class = category.to_string();
        event.url_super_category = "Security Risk".to_string();
    }
    event.url_category = url_category.to_string();
    event
}

fn baseline(ctx: &mut BlockContext, i: usize) -> ProxyEvent {
    let site = &NORMAL_SITES[ctx.pick_index(NORMAL_SITES.len(), i)];
    let user = ctx.pick_index(DEPARTMENTS.len(), i);
    let department = DEPARTMENTS[user];
    let company = ctx.pick(&COMPANIES, i);

    ProxyEvent {
        timestamp: ctx.timestamp(i),
        login: format!("{}-{}", department.to_lowercase(), slug(company)),
        protocol: "HTTP",
        destination: site.destination.to_string(),
        verdict: Verdict::Allowed,
        site_name: site.name.to_string(),
        category: site.category.to_string(),
        risk_score: site.risk_score,
        request_bytes: site.request_bytes,
        response_bytes: site.response_bytes,
        total_bytes: site.request_bytes + site.response_bytes,
        url_class: site.url_class.to_string(),
        url_super_category: site.url_super_category.to_string(),
        url_category: site.url_category.to_string(),
        department: format!("{} Department", department),
        client_ip: offset_ip(Ipv4Addr::new(172, 17, 1, 100), user),
        server_ip: site.server_ip,
        method: Method::Get,
        status: 200,
        user_agent: ctx.pick(&BROWSER_AGENTS, i).to_string(),
        rule_label: format!("URL_Allow_{}", user + 1),
        annotation: Annotation::None,
    }
}

fn repeated_url(ctx: &mut BlockContext, i: usize) -> ProxyEvent {
    ProxyEvent {
        destination: "api.example.com/endpoint1".to_string(),
        site_name: "API Endpoint".to_string(),
        url_category: "API".to_string(),
        user_agent: "curl/7.68.0".to_string(),
        rule_label: "API_Allow_1".to_string(),
        ..anomaly_event(ctx, i, 1)
    }
}

fn suspicious_user_agent(ctx: &mut BlockContext, i: usize, agents: &[String]) -> ProxyEvent {
    let pool: Vec<&str> = agents.iter().map(String::as_str).collect();
    let agent = ctx.pick(&pool, i).to_string();
    let event = ProxyEvent {
        destination: "admin.example.com/panel".to_string(),
        site_name: "Admin Panel".to_string(),
        department: "Engineering Department".to_string(),
        method: Method::Post,
        user_agent: agent,
        rule_label: format!("Suspicious_UA_Block_{}", i + 1),
        ..anomaly_event(ctx, i, 2)
    };

    blocked(event, "Technology", "Admin Access")
}

fn geographic_dispersion(ctx: &mut BlockContext, i: usize) -> ProxyEvent {
    let country = COUNTRIES[ctx.pick_index(COUNTRIES.len(), i)];
    let event = ProxyEvent {
        destination: "malware-site.com".to_string(),
        site_name: "Malware Site".to_string(),
        department: "Security Department".to_string(),
        client_ip: offset_ip(GEO_CLIENT_BASE, i),
        server_ip: offset_ip(GEO_SERVER_BASE, i),
        rule_label: format!("Geo_Block_{}_{}", country, i + 1),
        annotation: Annotation::Country(country),
        ..anomaly_event(ctx, i, 3)
    };
    blocked(event, "Malware", "Malware Distribution")
}

fn time_spike(ctx: &mut BlockContext, i: usize) -> ProxyEvent {
    // Squeeze the whole block into one minute whatever its size
    let spread = ctx.count.saturating_sub(1).max(SPIKE_WINDOW_SECS);
    let offset = (i * SPIKE_WINDOW_SECS / spread) as i64;

    ProxyEvent {
        timestamp: ctx.start + Duration::seconds(offset),
        destination: "api.example.com/endpoint2".to_string(),
        site_name: "API Endpoint".to_string(),
        url_category: "API".to_string(),
        rule_label: "API_Allow_2".to_string(),
        ..anomaly_event(ctx, i, 4)
    }
}

fn high_error_rate(ctx: &mut BlockContext, i: usize) -> ProxyEvent {
    let event = ProxyEvent {
        destination: format!("broken-site.com/page{}", i + 1),
        site_name: "Broken Site".to_string(),
        ..anomaly_event(ctx, i, 5)
    };

    if i % HEALTHY_EVERY == HEALTHY_EVERY - 1 {
        return ProxyEvent {
            url_category: "Web".to_string(),
            rule_label: format!("Web_Allow_{}", i + 1),
            ..event
        };
    }

    ProxyEvent {
        status: 404,
        rule_label: format!("404_Block_{}", i + 1),
        ..blocked(event, "Technology", "Broken Page")
    }
}

/// Stem used for a downloaded file of the given extension
fn file_stem(extension: &str) -> &'static str {
    match extension {
        "exe" => "download",
        "bat" | "cmd" | "ps1" | "vbs" | "js" => "script",
        "dll" => "payload",
        "zip" | "rar" | "jar" => "archive",
        _ => "update",
    }
}

/// Extensions the file-type block draws from; a configured list is replayed in order
enum ExtensionPool {
    Configured(Vec<String>),
    Default(Vec<String>),
}

fn suspicious_file_type(ctx: &mut BlockContext, i: usize, extensions: &ExtensionPool) -> ProxyEvent {
    let extension = match extensions {
        ExtensionPool::Configured(list) => list[i % list.len()].clone(),
        ExtensionPool::Default(list) => {
            let pool: Vec<&str> = list.iter().map(String::as_str).collect();
            ctx.pick(&pool, i).to_string()
        }
    };
    let file_name = format!("{}.{}", file_stem(&extension), extension);

    let event = ProxyEvent {
        destination: format!("malicious-site.com/{}", file_name),
        site_name: "Malicious Download".to_string(),
        department: "Security Department".to_string(),
        rule_label: format!("Malware_Block_{}", i + 1),
        annotation: Annotation::File {
            name: file_name,
            extension,
        },
        ..anomaly_event(ctx, i, 6)
    };
    blocked(event, "Malware", "Malware Downloads")
}

fn legacy_tls(ctx: &mut BlockContext, i: usize) -> ProxyEvent {
    let version = TlsVersion::LEGACY[ctx.pick_index(TlsVersion::LEGACY.len(), i)];

    ProxyEvent {
        protocol: "HTTPS",
        destination: "old-site.com".to_string(),
        site_name: "Old Site".to_string(),
        url_category: "Old Site".to_string(),
        rule_label: format!("Old_Site_{}", i + 1),
        annotation: Annotation::Tls(version),
        ..anomaly_event(ctx, i, 7)
    }
}

fn high_bandwidth(ctx: &mut BlockContext, i: usize) -> ProxyEvent {
    let file_name = format!("video{}.mp4", i + 1);

    ProxyEvent {
        destination: format!("large-file.com/{}", file_name),
        site_name: "Large File".to_string(),
        request_bytes: 10240,
        response_bytes: 20480,
        total_bytes: 30720,
        url_category: "Large File".to_string(),
        rule_label: format!("Large_File_{}", i + 1),
        annotation: Annotation::File {
            name: file_name,
            extension: "mp4".to_string(),
        },
        ..anomaly_event(ctx, i, 8)
    }
}
