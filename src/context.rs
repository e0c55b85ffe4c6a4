//! Node Context and Report Envelope
//!
//! Host facts are read locally (no network). Anything that cannot be read
//! is reported as an empty string rather than failing the run.

use crate::aggregate::AggregatedReport;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use sysinfo::System;

/// Environment variable naming the ambient environment
pub const ENVIRONMENT_VAR: &str = "CHEF_ENVIRONMENT";

/// Environment reported when nothing else is known
pub const DEFAULT_ENVIRONMENT: &str = "_default";

/// Facts about the host the scans ran on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFacts {
    pub hostname: String,
    /// Distribution id, e.g. `ubuntu`, `centos`, `macos`
    pub family: String,
    pub release: String,
    /// Environment the host is enrolled in, when known
    pub environment: Option<String>,
}

impl HostFacts {
    /// Read facts from the running system and process environment.
    pub fn gather() -> Self {
        Self {
            hostname: System::host_name().unwrap_or_default(),
            family: System::distribution_id(),
            release: System::os_version().unwrap_or_default(),
            environment: std::env::var(ENVIRONMENT_VAR)
                .ok()
                .filter(|e| !e.trim().is_empty()),
        }
    }
}

/// Operating system block of the envelope; architecture is not reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsInfo {
    pub release: String,
    pub family: String,
}

/// The JSON document uploaded to the compliance server
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEnvelope {
    pub node: String,
    pub os: OsInfo,
    pub environment: String,
    pub reports: BTreeMap<String, Value>,
    pub profiles: BTreeMap<String, String>,
}

impl ReportEnvelope {
    /// Wrap an aggregated report with node metadata.
    ///
    /// Explicit `node` and `environment` overrides win over host facts.
    pub fn build(
        report: AggregatedReport,
        facts: HostFacts,
        node: Option<&str>,
        environment: Option<&str>,
    ) -> Self {
        let environment = environment
            .map(str::to_string)
            .or(facts.environment)
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        Self {
            node: node.map(str::to_string).unwrap_or(facts.hostname),
            os: OsInfo {
                release: facts.release,
                family: facts.family,
            },
            environment,
            reports: report.results,
            profiles: report.owners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facts() -> HostFacts {
        HostFacts {
            hostname: "web-01".to_string(),
            family: "ubuntu".to_string(),
            release: "22.04".to_string(),
            environment: Some("production".to_string()),
        }
    }

    fn report() -> AggregatedReport {
        AggregatedReport {
            results: BTreeMap::from([("ssh-baseline".to_string(), json!({"controls": []}))]),
            owners: BTreeMap::from([("ssh-baseline".to_string(), "admin".to_string())]),
        }
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = ReportEnvelope::build(report(), facts(), None, None);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({
                "node": "web-01",
                "os": {"release": "22.04", "family": "ubuntu"},
                "environment": "production",
                "reports": {"ssh-baseline": {"controls": []}},
                "profiles": {"ssh-baseline": "admin"}
            })
        );
        assert!(value["os"].get("arch").is_none());
    }

    #[test]
    fn test_overrides_win() {
        let envelope = ReportEnvelope::build(report(), facts(), Some("db-07"), Some("staging"));
        assert_eq!(envelope.node, "db-07");
        assert_eq!(envelope.environment, "staging");
    }

    #[test]
    fn test_missing_facts_default_to_empty() {
        let envelope = ReportEnvelope::build(AggregatedReport::default(), HostFacts::default(), None, None);

        assert_eq!(envelope.node, "");
        assert_eq!(envelope.os.family, "");
        assert_eq!(envelope.os.release, "");
        assert_eq!(envelope.environment, DEFAULT_ENVIRONMENT);
        assert!(envelope.reports.is_empty());
    }

    #[test]
    fn test_gather_does_not_panic() {
        let facts = HostFacts::gather();
        assert!(facts.environment.as_deref() != Some(""));
    }
}
