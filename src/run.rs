//! Report Run
//!
//! Drives one run end to end: select artifacts, aggregate them, wrap them in
//! node metadata, resolve owner and endpoint, then submit once. Everything
//! before the upload is local, so configuration and artifact errors never
//! reach the network.

use crate::aggregate::aggregate;
use crate::config::ReportConfig;
use crate::context::{HostFacts, ReportEnvelope};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::manifest::RunManifest;
use crate::owner::resolve_owner;
use crate::submit::{AuthRoute, SignedClient, SubmissionTarget, Submitter};
use tracing::{debug, info};

/// A report ready to be uploaded
#[derive(Debug, Clone)]
pub struct PreparedReport {
    pub target: SubmissionTarget,
    pub envelope: ReportEnvelope,
}

/// Summary of a completed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub endpoint: String,
    pub route: AuthRoute,
    pub profiles: usize,
}

/// One report run
pub struct ReportRun {
    config: ReportConfig,
    facts: HostFacts,
}

impl ReportRun {
    /// Create a run using facts from the current host.
    pub fn new(config: ReportConfig) -> Self {
        Self::with_facts(config, HostFacts::gather())
    }

    pub fn with_facts(config: ReportConfig, facts: HostFacts) -> Self {
        Self { config, facts }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Build the envelope and target without touching the network.
    pub fn prepare(&self, manifest: &RunManifest) -> Result<PreparedReport> {
        let artifacts = manifest.selected();
        debug!(selected = artifacts.len(), declared = manifest.entries.len(), "Selected scan artifacts");

        let report = aggregate(artifacts)?;
        info!(profiles = report.len(), "Aggregated scan results");

        let envelope = ReportEnvelope::build(
            report,
            self.facts.clone(),
            self.config.node.as_deref(),
            self.config.environment.as_deref(),
        );

        let identity = self
            .config
            .platform
            .server_url
            .as_ref()
            .or(self.config.server.as_ref());
        let owner = resolve_owner(self.config.owner.as_deref(), identity)?;

        let endpoint = Endpoint::resolve(
            self.config.server.as_ref(),
            self.config.platform.server_url.as_ref(),
            self.config.variant,
            &owner,
        )?;

        Ok(PreparedReport {
            target: SubmissionTarget {
                endpoint,
                variant: self.config.variant,
                owner,
                auth_token: self.config.token.clone(),
            },
            envelope,
        })
    }

    /// Build the submitter for this run's auth path.
    ///
    /// Platform credentials are only loaded when no token is configured.
    pub fn submitter(&self) -> Result<Submitter> {
        let submitter = Submitter::new(&self.config.http)?;

        if self.config.uses_token() {
            return Ok(submitter);
        }

        let platform = SignedClient::from_config(&self.config.platform, &self.config.http)?;
        Ok(submitter.with_platform_client(Box::new(platform)))
    }

    /// Prepare and submit with the given submitter.
    pub async fn execute_with(&self, manifest: &RunManifest, submitter: &Submitter) -> Result<RunOutcome> {
        let prepared = self.prepare(manifest)?;
        Self::submit(prepared, submitter).await
    }

    /// Prepare and submit using this run's own submitter.
    pub async fn execute(&self, manifest: &RunManifest) -> Result<RunOutcome> {
        let prepared = self.prepare(manifest)?;
        let submitter = self.submitter()?;
        Self::submit(prepared, &submitter).await
    }

    async fn submit(prepared: PreparedReport, submitter: &Submitter) -> Result<RunOutcome> {
        let route = submitter.submit(&prepared.target, &prepared.envelope).await?;

        Ok(RunOutcome {
            endpoint: prepared.target.endpoint.to_string(),
            route,
            profiles: prepared.envelope.profiles.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{RunEntry, ScanArtifact};
    use crate::error::ReportError;
    use std::fs;
    use tempfile::tempdir;

    fn facts() -> HostFacts {
        HostFacts {
            hostname: "web-01".to_string(),
            family: "ubuntu".to_string(),
            release: "22.04".to_string(),
            environment: None,
        }
    }

    fn manifest(path: &std::path::Path) -> RunManifest {
        RunManifest {
            entries: vec![RunEntry::ComplianceProfile(ScanArtifact::new("admin", "ssh-baseline", path))],
            profiles: None,
        }
    }

    #[test]
    fn test_prepare_chef_scenario() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.json");
        fs::write(&path, r#"{"controls":[]}"#).unwrap();

        let config = ReportConfig::builder()
            .server("https://compliance.example.com/org/admin")
            .variant("chef")
            .build()
            .unwrap();

        let prepared = ReportRun::with_facts(config, facts()).prepare(&manifest(&path)).unwrap();

        assert_eq!(
            prepared.target.endpoint.to_string(),
            "https://compliance.example.com/org/admin/chef/organizations/admin/inspec"
        );
        assert_eq!(prepared.target.owner, "admin");
        assert_eq!(prepared.target.route(), AuthRoute::Platform);

        let body = serde_json::to_string(&prepared.envelope).unwrap();
        assert!(body.contains(r#""reports":{"ssh-baseline":{"controls":[]}}"#));
        assert!(body.contains(r#""profiles":{"ssh-baseline":"admin"}"#));
        assert!(body.contains(r#""environment":"_default""#));
    }

    #[test]
    fn test_owner_derived_from_platform_url_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.json");
        fs::write(&path, "{}").unwrap();

        let config = ReportConfig::builder()
            .server("https://compliance.example.com/org/admin")
            .platform_url("https://chef.example.com/organizations/acme")
            .variant("compliance")
            .token("secret")
            .build()
            .unwrap();

        let prepared = ReportRun::with_facts(config, facts()).prepare(&manifest(&path)).unwrap();
        assert_eq!(prepared.target.owner, "acme");
        assert_eq!(
            prepared.target.endpoint.to_string(),
            "https://compliance.example.com/org/admin/owners/acme/inspec"
        );
        assert_eq!(prepared.target.route(), AuthRoute::Bearer);
    }

    #[test]
    fn test_token_without_server_posts_to_local_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.json");
        fs::write(&path, "{}").unwrap();

        let config = ReportConfig::builder()
            .variant("compliance")
            .token("secret")
            .owner("ops")
            .build()
            .unwrap();

        let prepared = ReportRun::with_facts(config, facts()).prepare(&manifest(&path)).unwrap();
        assert_eq!(
            prepared.target.endpoint.to_string(),
            "https://localhost/organizations/ops/inspec"
        );
        assert_eq!(prepared.target.route(), AuthRoute::Bearer);
    }

    #[test]
    fn test_unreadable_artifact_stops_before_owner_resolution() {
        let dir = tempdir().unwrap();
        let config = ReportConfig::builder().build().unwrap();

        let err = ReportRun::with_facts(config, facts())
            .prepare(&manifest(&dir.path().join("missing.json")))
            .unwrap_err();
        assert!(matches!(err, ReportError::ArtifactRead { .. }));
    }

    #[test]
    fn test_unresolvable_owner() {
        let config = ReportConfig::builder().build().unwrap();
        let err = ReportRun::with_facts(config, facts())
            .prepare(&RunManifest::default())
            .unwrap_err();
        assert!(matches!(err, ReportError::OwnerResolution(_)));
    }

    #[test]
    fn test_submitter_needs_credentials_only_without_token() {
        let with_token = ReportConfig::builder().token("abc").build().unwrap();
        assert!(ReportRun::with_facts(with_token, facts()).submitter().is_ok());

        let without = ReportConfig::builder().build().unwrap();
        let err = ReportRun::with_facts(without, facts()).submitter().err().unwrap();
        assert!(matches!(err, ReportError::Credentials(_)));
    }
}
