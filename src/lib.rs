//! Compliance Report Library
//!
//! Collects locally produced compliance-scan results into one report and
//! uploads it to a compliance server, authenticating with a bearer token or
//! with the node's own platform credentials.

pub mod aggregate;
pub mod artifact;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod manifest;
pub mod owner;
pub mod run;
pub mod submit;

pub use aggregate::{aggregate, AggregatedReport};
pub use artifact::{select_artifacts, Identifier, RunEntry, ScanArtifact};
pub use config::{HttpConfig, PlatformConfig, ReportConfig, Variant};
pub use context::{HostFacts, ReportEnvelope};
pub use endpoint::Endpoint;
pub use error::{ReportError, Result};
pub use manifest::RunManifest;
pub use owner::resolve_owner;
pub use run::{PreparedReport, ReportRun, RunOutcome};
pub use submit::{AuthRoute, PlatformClient, SignedClient, SubmissionTarget, Submitter};
