//! Scan Artifacts and Run Entry Selection
//!
//! The driver declares everything it ran as a list of [`RunEntry`] values.
//! Only compliance-profile entries carry scan results; the selector picks
//! those out in declaration order.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Validated `owner/profile` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub owner: String,
    pub profile: String,
}

impl Identifier {
    /// Parse an `owner/profile` string.
    pub fn parse(value: &str) -> Result<Self> {
        let (owner, profile) = value
            .split_once('/')
            .ok_or_else(|| ReportError::MalformedIdentifier(value.to_string()))?;

        Self::new(owner, profile).map_err(|_| ReportError::MalformedIdentifier(value.to_string()))
    }

    /// Build an identifier from separate parts.
    pub fn new(owner: &str, profile: &str) -> Result<Self> {
        let owner = owner.trim();
        let profile = profile.trim();

        if owner.is_empty() || profile.is_empty() || owner.contains('/') || profile.contains('/') {
            return Err(ReportError::MalformedIdentifier(format!("{}/{}", owner, profile)));
        }

        Ok(Self {
            owner: owner.to_string(),
            profile: profile.to_string(),
        })
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.profile)
    }
}

/// A finished scan whose result file is ready to be reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanArtifact {
    /// Profile owner; may be empty when `profile` is written as `owner/profile`
    #[serde(default)]
    pub owner: String,
    /// Profile name, or a full `owner/profile` identifier
    pub profile: String,
    /// JSON result file written by the scan
    pub result_path: PathBuf,
}

impl ScanArtifact {
    pub fn new(owner: impl Into<String>, profile: impl Into<String>, result_path: impl Into<PathBuf>) -> Self {
        Self {
            owner: owner.into(),
            profile: profile.into(),
            result_path: result_path.into(),
        }
    }

    /// Resolve this artifact's owner and profile.
    ///
    /// A qualified `owner/profile` in the profile field wins over the
    /// separate owner field.
    pub fn identifier(&self) -> Result<Identifier> {
        if self.profile.contains('/') {
            Identifier::parse(&self.profile)
        } else if self.owner.trim().is_empty() {
            Err(ReportError::MalformedIdentifier(self.profile.clone()))
        } else {
            Identifier::new(&self.owner, &self.profile)
        }
    }

    /// The `owner/profile` key used by selection maps
    pub fn qualified_name(&self) -> String {
        let owner = self.owner.trim();
        let profile = self.profile.trim();

        if profile.contains('/') || owner.is_empty() {
            profile.to_string()
        } else {
            format!("{}/{}", owner, profile)
        }
    }
}

/// One entry declared by the driver for this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunEntry {
    /// A compliance profile that was executed and left a result file
    ComplianceProfile(ScanArtifact),
    /// Anything else the driver ran (packages, services, ...)
    #[serde(other)]
    Other,
}

impl RunEntry {
    pub fn as_artifact(&self) -> Option<&ScanArtifact> {
        match self {
            RunEntry::ComplianceProfile(artifact) => Some(artifact),
            RunEntry::Other => None,
        }
    }
}

/// Pick the scan artifacts that belong in this report, keeping their order.
///
/// With a selection map, only profiles enabled in it are kept; without one
/// every compliance profile entry is kept.
pub fn select_artifacts<'a>(
    entries: &'a [RunEntry],
    selection: Option<&BTreeMap<String, bool>>,
) -> Vec<&'a ScanArtifact> {
    entries
        .iter()
        .filter_map(RunEntry::as_artifact)
        .filter(|artifact| match selection {
            None => true,
            Some(selection) => {
                let key = artifact.qualified_name();
                let enabled = selection.get(&key).copied().unwrap_or(false);
                if !enabled {
                    debug!(profile = %key, "Skipping profile not enabled for this run");
                }
                enabled
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_parse() {
        let id = Identifier::parse("admin/ssh-baseline").unwrap();
        assert_eq!(id.owner, "admin");
        assert_eq!(id.profile, "ssh-baseline");
        assert_eq!(id.to_string(), "admin/ssh-baseline");
    }

    #[test]
    fn test_identifier_parse_rejects_malformed() {
        for value in ["ssh-baseline", "/ssh-baseline", "admin/", "a/b/c", ""] {
            let err = Identifier::parse(value).unwrap_err();
            assert!(
                matches!(err, ReportError::MalformedIdentifier(_)),
                "expected MalformedIdentifier for {:?}",
                value
            );
        }
    }

    #[test]
    fn test_artifact_identifier_sources() {
        let separate = ScanArtifact::new("admin", "ssh-baseline", "a.json");
        assert_eq!(separate.identifier().unwrap(), Identifier::parse("admin/ssh-baseline").unwrap());

        let qualified = ScanArtifact::new("", "base/linux", "b.json");
        assert_eq!(qualified.identifier().unwrap().owner, "base");

        let ownerless = ScanArtifact::new("", "linux", "c.json");
        assert!(matches!(
            ownerless.identifier(),
            Err(ReportError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_select_keeps_profiles_in_order() {
        let entries = vec![
            RunEntry::ComplianceProfile(ScanArtifact::new("admin", "ssh", "1.json")),
            RunEntry::Other,
            RunEntry::ComplianceProfile(ScanArtifact::new("admin", "linux", "2.json")),
            RunEntry::ComplianceProfile(ScanArtifact::new("base", "apache", "3.json")),
        ];

        let selected = select_artifacts(&entries, None);
        let names: Vec<_> = selected.iter().map(|a| a.profile.as_str()).collect();
        assert_eq!(names, vec!["ssh", "linux", "apache"]);
    }

    #[test]
    fn test_select_honors_selection_map() {
        let entries = vec![
            RunEntry::ComplianceProfile(ScanArtifact::new("admin", "ssh", "1.json")),
            RunEntry::ComplianceProfile(ScanArtifact::new("", "admin/linux", "2.json")),
            RunEntry::ComplianceProfile(ScanArtifact::new("base", "apache", "3.json")),
        ];
        let selection = BTreeMap::from([
            ("admin/ssh".to_string(), true),
            ("admin/linux".to_string(), false),
        ]);

        let selected = select_artifacts(&entries, Some(&selection));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].profile, "ssh");
    }

    #[test]
    fn test_selection_key_ignores_surrounding_whitespace() {
        let entries = vec![RunEntry::ComplianceProfile(ScanArtifact::new(" admin", "ssh ", "1.json"))];
        let selection = BTreeMap::from([("admin/ssh".to_string(), true)]);

        assert_eq!(entries[0].as_artifact().unwrap().qualified_name(), "admin/ssh");
        assert_eq!(select_artifacts(&entries, Some(&selection)).len(), 1);
    }

    #[test]
    fn test_select_empty_is_valid() {
        let entries = vec![RunEntry::Other];
        assert!(select_artifacts(&entries, None).is_empty());
        assert!(select_artifacts(&[], None).is_empty());
    }

    #[test]
    fn test_run_entry_deserialization() {
        let json = r#"[
            {"kind": "compliance_profile", "owner": "admin", "profile": "ssh", "result_path": "/tmp/ssh.json"},
            {"kind": "package", "name": "nginx", "version": "1.24"}
        ]"#;

        let entries: Vec<RunEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            RunEntry::ComplianceProfile(ScanArtifact::new("admin", "ssh", "/tmp/ssh.json"))
        );
        assert_eq!(entries[1], RunEntry::Other);
    }
}
