//! Report Aggregation
//!
//! Reads each selected scan result from disk and merges them into a single
//! report keyed by profile name.

use crate::artifact::ScanArtifact;
use crate::error::{ReportError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use tracing::debug;

/// Results and owners of every profile in one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedReport {
    /// Parsed result document per profile, passed through untouched
    pub results: BTreeMap<String, Value>,
    /// Owner per profile
    pub owners: BTreeMap<String, String>,
}

impl AggregatedReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Merge the result files of `artifacts` into one report.
///
/// Fails on the first artifact that cannot be identified, read or parsed, and
/// on a profile name that appears twice.
pub fn aggregate<'a, I>(artifacts: I) -> Result<AggregatedReport>
where
    I: IntoIterator<Item = &'a ScanArtifact>,
{
    let mut report = AggregatedReport::default();

    for artifact in artifacts {
        let id = artifact.identifier()?;

        if report.results.contains_key(&id.profile) {
            return Err(ReportError::DuplicateProfile(id.profile));
        }

        let raw = fs::read(&artifact.result_path).map_err(|source| {
            ReportError::ArtifactRead {
                path: artifact.result_path.clone(),
                source,
            }
        })?;

        let result: Value =
            serde_json::from_slice(&raw).map_err(|source| ReportError::ArtifactParse {
                path: artifact.result_path.clone(),
                source,
            })?;

        debug!(owner = %id.owner, profile = %id.profile, path = ?artifact.result_path, "Loaded scan result");

        report.owners.insert(id.profile.clone(), id.owner);
        report.results.insert(id.profile, result);
    }

    Ok(report)
}
