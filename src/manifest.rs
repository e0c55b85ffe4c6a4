//! Run Manifest
//!
//! The JSON document the driver hands over: every entry it ran, plus an
//! optional map of which `owner/profile` selections are enabled.

use crate::artifact::{select_artifacts, RunEntry, ScanArtifact};
use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default)]
    pub entries: Vec<RunEntry>,
    /// `owner/profile` → enabled; absent means every profile entry counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<BTreeMap<String, bool>>,
}

impl RunManifest {
    /// Read a manifest from disk.
    ///
    /// Relative result paths are resolved against the manifest's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ReportError::InvalidConfig(format!("failed to read manifest {:?}: {}", path, e))
        })?;

        let mut manifest: RunManifest = serde_json::from_str(&raw).map_err(|e| {
            ReportError::InvalidConfig(format!("failed to parse manifest {:?}: {}", path, e))
        })?;

        if let Some(base) = path.parent() {
            for entry in &mut manifest.entries {
                if let RunEntry::ComplianceProfile(artifact) = entry {
                    if artifact.result_path.is_relative() {
                        artifact.result_path = base.join(&artifact.result_path);
                    }
                }
            }
        }

        Ok(manifest)
    }

    /// The scan artifacts selected for this run
    pub fn selected(&self) -> Vec<&ScanArtifact> {
        select_artifacts(&self.entries, self.profiles.as_ref())
    }
}
