// src/cache.rs
use crate::types::HarvestError;
use crate::utils::normalize_zone;
use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reserved key holding zones whose NS lookup failed.
pub const INVALID_KEY: &str = "_invalid";

/// Zones classified by earlier runs.
///
/// On disk this is a JSON object mapping each valid zone to
/// `[zone, [nameserver, ...]]`, plus `"_invalid": [zone, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cache {
    valid: BTreeMap<String, Vec<String>>,
    invalid: BTreeSet<String>,
}

impl Cache {
    pub fn is_valid(&self, zone: &str) -> bool {
        self.valid.contains_key(zone)
    }

    pub fn is_invalid(&self, zone: &str) -> bool {
        self.invalid.contains(zone)
    }

    pub fn contains(&self, zone: &str) -> bool {
        self.is_valid(zone) || self.is_invalid(zone)
    }

    /// Record a zone with its nameservers. Existing entries are kept.
    pub fn insert_valid(&mut self, zone: &str, nameservers: Vec<String>) -> bool {
        let zone = normalize_zone(zone);
        if zone.is_empty() || self.valid.contains_key(&zone) {
            return false;
        }
        self.valid.insert(zone, nameservers);
        true
    }

    pub fn insert_invalid(&mut self, zone: &str) -> bool {
        let zone = normalize_zone(zone);
        if zone.is_empty() {
            return false;
        }
        self.invalid.insert(zone)
    }

    pub fn valid_zones(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.valid.iter()
    }

    /// Zones whose NS lookup failed, in name order.
    pub fn invalid_zones(&self) -> impl Iterator<Item = &String> {
        self.invalid.iter()
    }

    pub fn len(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (zone, nameservers) in &self.valid {
            map.insert(
                zone.clone(),
                Value::Array(vec![
                    Value::String(zone.clone()),
                    Value::Array(nameservers.iter().cloned().map(Value::String).collect()),
                ]),
            );
        }
        map.insert(
            INVALID_KEY.to_string(),
            Value::Array(self.invalid.iter().cloned().map(Value::String).collect()),
        );
        Value::Object(map)
    }

    pub fn from_json(value: Value) -> Result<Self, HarvestError> {
        let Value::Object(map) = value else {
            return Err(HarvestError::CacheError(
                "cache root must be a JSON object".to_string(),
            ));
        };

        let mut cache = Cache::default();
        for (key, entry) in map {
            if key == INVALID_KEY {
                let zones: Vec<String> = serde_json::from_value(entry)
                    .map_err(|e| HarvestError::CacheError(format!("{}: {}", INVALID_KEY, e)))?;
                for zone in zones {
                    cache.insert_invalid(&zone);
                }
                continue;
            }

            let (zone, nameservers): (String, Vec<String>) = serde_json::from_value(entry)
                .map_err(|e| HarvestError::CacheError(format!("entry {}: {}", key, e)))?;
            cache.insert_valid(&zone, nameservers);
        }

        Ok(cache)
    }
}

/// File-backed persistence for [`Cache`], read and written wholesale.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file yields an empty cache.
    pub fn load(&self) -> Result<Cache, HarvestError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache at {}, starting empty", self.path.display());
                return Ok(Cache::default());
            }
            Err(e) => {
                return Err(HarvestError::CacheError(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let value: Value = serde_json::from_str(&contents).map_err(|e| {
            HarvestError::CacheError(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;
        let cache = Cache::from_json(value)?;

        info!(
            "Loaded cache {}: {} valid, {} invalid zones",
            self.path.display(),
            cache.valid.len(),
            cache.invalid.len()
        );
        Ok(cache)
    }

    /// Write through a sibling temporary file so a crash never leaves half a cache.
    pub fn save(&self, cache: &Cache) -> Result<(), HarvestError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                HarvestError::CacheError(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_string(&cache.to_json())?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                HarvestError::CacheError(format!("Failed to write {}: {}", self.path.display(), e))
            })?;

        info!("Saved cache {} ({} zones)", self.path.display(), cache.len());
        Ok(())
    }
}
