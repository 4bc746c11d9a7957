// src/output.rs
use crate::types::{HarvestError, HarvestReport};
use crate::utils::file_safe;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes successful transfers to `<folder>/<zone>_<owner_host>.zone`.
///
/// Each `(zone, owner_host)` pair maps to exactly one path, so concurrent
/// workers never share a file. Rewriting the same pair replaces the file.
#[derive(Debug, Clone)]
pub struct ArtifactSink {
    folder: PathBuf,
}

impl ArtifactSink {
    /// Create the folder up front so an unwritable destination fails before any work starts.
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self, HarvestError> {
        let folder = folder.into();
        fs::create_dir_all(&folder).map_err(|e| {
            HarvestError::OutputError(format!("Failed to create {}: {}", folder.display(), e))
        })?;

        let probe = folder.join(".zoneharvest-write-test");
        File::create(&probe)
            .and_then(|_| fs::remove_file(&probe))
            .map_err(|e| {
                HarvestError::OutputError(format!("{} is not writable: {}", folder.display(), e))
            })?;

        Ok(Self { folder })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn artifact_path(&self, zone: &str, owner_host: &str) -> PathBuf {
        self.folder
            .join(format!("{}_{}.zone", file_safe(zone), file_safe(owner_host)))
    }

    /// Persist a complete payload. Data goes to a temporary file first, so the
    /// canonical path only ever holds whole transfers.
    pub fn write_artifact(
        &self,
        zone: &str,
        owner_host: &str,
        payload: &[u8],
    ) -> Result<PathBuf, HarvestError> {
        let path = self.artifact_path(zone, owner_host);
        let mut tmp = path.clone().into_os_string();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);

        let mut file = File::create(&tmp)
            .map_err(|e| HarvestError::OutputError(format!("Failed to create file: {}", e)))?;
        file.write_all(payload)
            .and_then(|_| file.sync_all())
            .map_err(|e| HarvestError::OutputError(format!("Failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| HarvestError::OutputError(format!("Failed to move {}: {}", path.display(), e)))?;

        Ok(path)
    }
}

pub fn write_report(path: &Path, report: &HarvestReport) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| HarvestError::OutputError(format!("Failed to create directory: {}", e)))?;
    }

    let json = serde_json::to_string_pretty(report)
        .map_err(|e| HarvestError::OutputError(format!("Failed to serialize JSON: {}", e)))?;

    let mut file = File::create(path)
        .map_err(|e| HarvestError::OutputError(format!("Failed to create file: {}", e)))?;
    writeln!(file, "{}", json).map_err(|e| HarvestError::OutputError(e.to_string()))?;

    Ok(())
}
