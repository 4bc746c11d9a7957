// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ROOT_ZONE_URL: &str = "https://www.internic.net/domain/root.zone";
pub const PUBLIC_SUFFIX_URL: &str = "https://publicsuffix.org/list/public_suffix_list.dat";
pub const NTLD_URL: &str = "https://api.ntldstats.net/i/tlds/csv";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub workers: usize,
    pub transfer_timeout: Duration,
    pub http_timeout: Duration,
    pub user_agent: String,
    pub cache_path: PathBuf,
    pub output: OutputConfig,
    pub resolver: ResolverConfig,
    pub sources: SourceUrls,
    pub skip_zones: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 20,
            transfer_timeout: Duration::from_secs(35),
            http_timeout: Duration::from_secs(30),
            user_agent: "zoneharvest/0.1".to_string(),
            cache_path: PathBuf::from("cache.json"),
            output: OutputConfig::default(),
            resolver: ResolverConfig::default(),
            sources: SourceUrls::default(),
            skip_zones: ["com", "net", "asia", "biz", "org", "info", "museum", "us", "arpa"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub folder: PathBuf,
    pub log_file: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
    pub verbose: bool,
    pub silent: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("zones"),
            log_file: None,
            report_file: None,
            verbose: false,
            silent: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub timeout: Duration,
    pub nameservers: Vec<String>,
    pub use_system_resolver: bool,
    /// Live NS lookups per second while building the universe. `None` disables the limit.
    pub ns_lookup_rate: Option<u32>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            nameservers: vec![
                "8.8.8.8:53".to_string(),
                "8.8.4.4:53".to_string(),
                "1.1.1.1:53".to_string(),
                "1.0.0.1:53".to_string(),
            ],
            use_system_resolver: false,
            ns_lookup_rate: Some(50),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUrls {
    pub root_zone: String,
    pub public_suffix: String,
    pub ntlds: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            root_zone: ROOT_ZONE_URL.to_string(),
            public_suffix: PUBLIC_SUFFIX_URL.to_string(),
            ntlds: NTLD_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Cache,
    RootZone,
    PublicSuffix,
    Direct,
}

/// Whether a candidate's nameservers were confirmed. `Invalid` candidates are
/// kept apart from the scan and recorded in the cache's invalid set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    Unknown,
    Valid,
    Invalid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneCandidate {
    pub name: String,
    pub nameserver_hints: Vec<String>,
    pub origin: Origin,
    pub status: ZoneStatus,
}

impl ZoneCandidate {
    pub fn new(name: &str, hints: Vec<String>, origin: Origin) -> Self {
        let mut nameserver_hints: Vec<String> = Vec::with_capacity(hints.len());
        for hint in hints {
            let hint = crate::utils::normalize_zone(&hint);
            if !hint.is_empty() && !nameserver_hints.contains(&hint) {
                nameserver_hints.push(hint);
            }
        }

        Self {
            name: crate::utils::normalize_zone(name),
            nameserver_hints,
            origin,
            status: ZoneStatus::Unknown,
        }
    }

    pub fn with_status(mut self, status: ZoneStatus) -> Self {
        self.status = status;
        self
    }
}

/// A concrete nameserver address for one of a zone's hints. Port 53 is implied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub owner_host: String,
    pub address: IpAddr,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.owner_host, self.address)
    }
}

/// How deep in the delegation chain a transfer attempt sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    TopLevel,
    Delegated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferOutcome {
    Success,
    Failure,
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub zone: String,
    pub endpoint: Endpoint,
    pub outcome: TransferOutcome,
    pub byte_count: usize,
    pub artifact: Option<PathBuf>,
    pub depth: Depth,
    pub delegated: Vec<TransferResult>,
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        self.outcome == TransferOutcome::Success
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneReport {
    pub zone: String,
    pub origin: Origin,
    pub endpoints: Vec<Endpoint>,
    pub results: Vec<TransferResult>,
}

impl ZoneReport {
    pub fn successful_hosts(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.endpoint.owner_host.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestStats {
    pub zones_checked: usize,
    pub successful_transfers: usize,
    pub delegated_transfers: usize,
    pub failed_attempts: usize,
    pub duration: Duration,
}

impl HarvestStats {
    pub fn from_reports(reports: &[ZoneReport], duration: Duration) -> Self {
        let mut stats = Self {
            zones_checked: reports.len(),
            duration,
            ..Self::default()
        };

        for result in reports.iter().flat_map(|r| r.results.iter()) {
            if result.is_success() {
                stats.successful_transfers += 1;
            } else {
                stats.failed_attempts += 1;
            }
            for child in &result.delegated {
                if child.is_success() {
                    stats.delegated_transfers += 1;
                } else {
                    stats.failed_attempts += 1;
                }
            }
        }

        stats
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestReport {
    pub stats: HarvestStats,
    pub zones: Vec<ZoneReport>,
    pub timestamp: String,
}

/// Ways a single zone transfer exchange can end without a complete stream.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("server answered {0}")]
    Refused(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Source error in {source_name}: {message}")]
    SourceError {
        source_name: String,
        message: String,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Resolution error: {0}")]
    ResolutionError(String),

    #[error("Transfer error: {0}")]
    TransferError(#[from] TransferError),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}
