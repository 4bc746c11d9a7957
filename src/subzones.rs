// src/subzones.rs
use crate::types::HarvestError;
use crate::utils::normalize_zone;
use regex::Regex;

/// Sets this large are treated as wildcard or misconfigured delegations.
pub const MAX_SUBZONES: usize = 15;

/// Child zones delegated to the nameserver that served the parent transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubzoneSet {
    names: Vec<String>,
}

impl SubzoneSet {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn within_fan_out(&self) -> bool {
        self.names.len() < MAX_SUBZONES
    }

    /// Members to transfer, or nothing when the set trips the fan-out guard.
    pub fn into_targets(self) -> Vec<String> {
        if self.within_fan_out() {
            self.names
        } else {
            Vec::new()
        }
    }
}

/// Scan `payload` for NS records whose target is `owner_host` and collect
/// their owner names, excluding `zone` itself, in first-seen order.
pub fn discover(payload: &[u8], zone: &str, owner_host: &str) -> Result<SubzoneSet, HarvestError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| HarvestError::ParseError(format!("payload for {} is not UTF-8: {}", zone, e)))?;

    let host = normalize_zone(owner_host);
    let pattern = format!(r"(?i)\sNS\s+{}\.?(?:\s|$)", regex::escape(&host));
    let ns_match = Regex::new(&pattern)
        .map_err(|e| HarvestError::ParseError(format!("Regex error: {}", e)))?;

    let parent = normalize_zone(zone);
    let mut set = SubzoneSet::default();

    for line in text.lines() {
        if line.starts_with(';') || !ns_match.is_match(line) {
            continue;
        }

        let Some(owner) = line.split_whitespace().next() else {
            continue;
        };
        let child = normalize_zone(owner);
        if child.is_empty() || child == parent || set.names.contains(&child) {
            continue;
        }
        set.names.push(child);
    }

    Ok(set)
}
