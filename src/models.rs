use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Number of columns in every corpus record
pub const FIELD_COUNT: usize = 34;

/// Timestamp layout of the proxy log format, e.g. `Mon Jan 15 08:00:00 2024`
pub const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Header names in authoritative column order.
///
/// The names are inherited from an external proxy log format, and most
/// positions carry something other than what the header says. Consumers
/// read the corpus by position; [`column`] names each position by the
/// content it actually holds. In particular `threatName` and
/// `threatSeverity` hold the internal client IP and external server IP,
/// and `riskScore`/`malwareCategory`/`malwareClass` hold the HTTP method,
/// status code and user agent.
pub const COLUMNS: [&str; FIELD_COUNT] = [
    "timestamp",
    "login",
    "department",
    "company",
    "cloudName",
    "clientIP",
    "clientInternalIP",
    "clientPublicIP",
    "serverIP",
    "location",
    "url",
    "host",
    "requestMethod",
    "responseCode",
    "userAgent",
    "referer",
    "contentType",
    "action",
    "reason",
    "ruleType",
    "ruleLabel",
    "threatName",
    "threatSeverity",
    "riskScore",
    "malwareCategory",
    "malwareClass",
    "urlCategory",
    "urlSuperCategory",
    "urlClass",
    "appName",
    "appClass",
    "appRiskScore",
    "fileName",
    "fileType",
];

/// Column positions, named by what they carry rather than by header
pub mod column {
    pub const TIMESTAMP: usize = 0;
    pub const LOGIN: usize = 1;
    /// `department` header
    pub const PROTOCOL: usize = 2;
    /// `company` header
    pub const DESTINATION: usize = 3;
    /// `cloudName` header
    pub const VERDICT: usize = 4;
    pub const SITE_NAME: usize = 5;
    pub const CATEGORY: usize = 6;
    pub const RISK_SCORE: usize = 7;
    pub const REQUEST_BYTES: usize = 8;
    pub const RESPONSE_BYTES: usize = 9;
    pub const TOTAL_BYTES: usize = 10;
    pub const URL_CLASS: usize = 11;
    pub const URL_SUPER_CATEGORY: usize = 12;
    pub const URL_CATEGORY: usize = 13;
    /// `ruleType` header, repeats the login
    pub const IDENTITY: usize = 19;
    /// `ruleLabel` header
    pub const DEPARTMENT: usize = 20;
    /// `threatName` header
    pub const CLIENT_IP: usize = 21;
    /// `threatSeverity` header
    pub const SERVER_IP: usize = 22;
    /// `riskScore` header
    pub const METHOD: usize = 23;
    /// `malwareCategory` header
    pub const STATUS: usize = 24;
    /// `malwareClass` header
    pub const USER_AGENT: usize = 25;
    /// `urlSuperCategory` header
    pub const RULE_TYPE: usize = 27;
    /// `urlClass` header
    pub const RULE_LABEL: usize = 28;
    /// File name, the client TLS version of a legacy TLS record, or the
    /// source country of a geographic record
    pub const FILE_NAME: usize = 32;
    pub const FILE_TYPE: usize = 33;
}

/// One corpus row: exactly [`FIELD_COUNT`] text fields in column order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    fields: [String; FIELD_COUNT],
}

impl LogRecord {
    pub fn new(fields: [String; FIELD_COUNT]) -> Self {
        LogRecord { fields }
    }

    pub fn fields(&self) -> &[String; FIELD_COUNT] {
        &self.fields
    }

    /// Get the raw text at a column position
    pub fn get(&self, column: usize) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Parse the timestamp column
    pub fn timestamp(&self) -> Result<NaiveDateTime> {
        parse_timestamp(&self.fields[column::TIMESTAMP])
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for LogRecord {
    type Error = anyhow::Error;

    fn try_from(fields: Vec<String>) -> Result<Self> {
        let found = fields.len();
        match <[String; FIELD_COUNT]>::try_from(fields) {
            Ok(fields) => Ok(LogRecord { fields }),
            Err(_) => bail!("expected {} fields, found {}", FIELD_COUNT, found),
        }
    }
}

/// Format a timestamp the way the proxy log format does
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp written by [`format_timestamp`]
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .with_context(|| format!("Invalid timestamp: {:?}", value))
}

/// Allow/block outcome of a simulated request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Blocked,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allowed => "Allowed",
            Verdict::Blocked => "Blocked",
        }
    }

    /// Policy engine that produced the verdict
    pub fn rule_type(&self) -> &'static str {
        match self {
            Verdict::Allowed => "URLFilter",
            Verdict::Blocked => "ThreatProtection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Protocol versions the detector treats as outdated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    Ssl2,
    Ssl3,
    Tls10,
    Tls11,
}

impl TlsVersion {
    pub const LEGACY: [TlsVersion; 4] = [
        TlsVersion::Ssl2,
        TlsVersion::Ssl3,
        TlsVersion::Tls10,
        TlsVersion::Tls11,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Ssl2 => "SSLv2",
            TlsVersion::Ssl3 => "SSLv3",
            TlsVersion::Tls10 => "TLSv1.0",
            TlsVersion::Tls11 => "TLSv1.1",
        }
    }
}

/// Extra detail carried in the `fileName`/`fileType` slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    None,
    File { name: String, extension: String },
    /// The downstream parser reads the client TLS version from `fileName`
    Tls(TlsVersion),
    /// Source country code; the downstream parser reads `sourceIPCountry` from `fileName`
    Country(&'static str),
}

/// Semantic view of one simulated proxy request.
///
/// [`ProxyEvent::into_record`] is the only place that knows which column
/// each value lands in.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyEvent {
    pub timestamp: NaiveDateTime,
    pub login: String,
    pub protocol: &'static str,
    pub destination: String,
    pub verdict: Verdict,
    pub site_name: String,
    pub category: String,
    pub risk_score: u8,
    pub request_bytes: u64,
    pub response_bytes: u64,
    pub total_bytes: u64,
    pub url_class: String,
    pub url_super_category: String,
    pub url_category: String,
    pub department: String,
    pub client_ip: Ipv4Addr,
    pub server_ip: Ipv4Addr,
    pub method: Method,
    pub status: u16,
    pub user_agent: String,
    pub rule_label: String,
    pub annotation: Annotation,
}

impl ProxyEvent {
    pub fn into_record(self) -> LogRecord {
        let (file_name, file_type) = match self.annotation {
            Annotation::None => ("NA".to_string(), "N/A".to_string()),
            Annotation::File { name, extension } => (name, extension),
            Annotation::Tls(version) => (version.as_str().to_string(), "N/A".to_string()),
            Annotation::Country(code) => (code.to_string(), "N/A".to_string()),
        };

        LogRecord::new([
            format_timestamp(&self.timestamp),
            self.login.clone(),
            self.protocol.to_string(),
            self.destination,
            self.verdict.as_str().to_string(),
            self.site_name,
            self.category,
            self.risk_score.to_string(),
            self.request_bytes.to_string(),
            self.response_bytes.to_string(),
            self.total_bytes.to_string(),
            self.url_class,
            self.url_super_category,
            self.url_category,
            "None".to_string(),
            "None".to_string(),
            "0".to_string(),
            "None".to_string(),
            "None".to_string(),
            self.login,
            self.department,
            self.client_ip.to_string(),
            self.server_ip.to_string(),
            self.method.as_str().to_string(),
            self.status.to_string(),
            self.user_agent,
            "None".to_string(),
            self.verdict.rule_type().to_string(),
            self.rule_label,
            "Other".to_string(),
            "None".to_string(),
            "NA".to_string(),
            file_name,
            file_type,
        ])
    }
}

/// Anomaly archetypes, in catalog order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Baseline,
    RepeatedUrl,
    SuspiciousUserAgent,
    GeographicDispersion,
    TimeSpike,
    HighErrorRate,
    SuspiciousFileType,
    LegacyTls,
    HighBandwidth,
}

impl Scenario {
    /// Every scenario in the order blocks are emitted
    pub const ALL: [Scenario; 9] = [
        Scenario::Baseline,
        Scenario::RepeatedUrl,
        Scenario::SuspiciousUserAgent,
        Scenario::GeographicDispersion,
        Scenario::TimeSpike,
        Scenario::HighErrorRate,
        Scenario::SuspiciousFileType,
        Scenario::LegacyTls,
        Scenario::HighBandwidth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Baseline => "baseline",
            Scenario::RepeatedUrl => "repeated-url",
            Scenario::SuspiciousUserAgent => "suspicious-user-agent",
            Scenario::GeographicDispersion => "geographic-dispersion",
            Scenario::TimeSpike => "time-spike",
            Scenario::HighErrorRate => "high-error-rate",
            Scenario::SuspiciousFileType => "suspicious-file-type",
            Scenario::LegacyTls => "legacy-tls",
            Scenario::HighBandwidth => "high-bandwidth",
        }
    }

    /// Detection rule the block is meant to trigger
    pub fn description(&self) -> &'static str {
        match self {
            Scenario::Baseline => "Normal traffic",
            Scenario::RepeatedUrl => "URL Pattern Analysis",
            Scenario::SuspiciousUserAgent => "User Agent Analysis",
            Scenario::GeographicDispersion => "Geographic Access",
            Scenario::TimeSpike => "Time Pattern Analysis",
            Scenario::HighErrorRate => "Response Code Analysis",
            Scenario::SuspiciousFileType => "File Access Monitoring",
            Scenario::LegacyTls => "SSL/TLS Behavior",
            Scenario::HighBandwidth => "Bandwidth Usage",
        }
    }

    pub fn is_anomaly(&self) -> bool {
        *self != Scenario::Baseline
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == wanted)
            .with_context(|| {
                let known: Vec<&str> = Scenario::ALL.iter().map(Scenario::name).collect();
                format!("Unknown scenario {:?} (expected one of: {})", s, known.join(", "))
            })
    }
}
