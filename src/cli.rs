use crate::error::ErrorContext;
use crate::types::HarvestError;
use crate::utils;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "zoneharvest",
    version,
    about = "Find DNS zones that allow public AXFR and keep what they hand out",
    long_about = "zoneharvest builds a list of candidate zones from the IANA root zone and the public suffix list,\nresolves their nameservers and attempts a zone transfer against each one.\nSuccessful transfers are saved per zone and nameserver; delegations served by the same\nnameserver are followed one level down."
)]
pub struct Args {
    /// Number of zones checked concurrently (default: 20)
    #[arg(short = 'p', long = "workers", visible_alias = "processes", value_name = "N", allow_negative_numbers = true)]
    pub workers: Option<i64>,

    /// Folder transferred zones are written to (default: zones/)
    #[arg(short = 'f', long = "folder", value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// Cache of previously classified zones (default: cache.json)
    #[arg(long = "cache", value_name = "FILE")]
    pub cache: Option<PathBuf>,

    /// Write log records to this file instead of stderr
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Zone(s) to check directly, skipping the root zone and public suffix list
    #[arg(short = 'd', long = "domain", value_name = "ZONE")]
    pub domain: Vec<String>,

    /// File containing zones to check directly, one per line
    #[arg(short = 'l', long = "list", value_name = "FILE")]
    pub domains_file: Option<PathBuf>,

    /// Per-transfer time budget in seconds (default: 35)
    #[arg(short = 't', long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Write a JSON report of the run
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Silent mode (no progress bar)
    #[arg(long = "silent")]
    pub silent: bool,

    /// Verbose mode
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

impl Args {
    /// Zones named with `-d` and `-l`. Empty means a full scan.
    pub fn direct_zones(&self) -> Result<Vec<String>, HarvestError> {
        let mut zones = self.domain.clone();

        if let Some(file_path) = &self.domains_file {
            let lines = utils::read_lines(file_path)
                .with_context(|| format!("Failed to read zones from {}", file_path.display()))?;
            zones.extend(lines.into_iter().map(|l| l.trim().to_string()));
        }

        Ok(utils::deduplicate_names(zones))
    }
}
