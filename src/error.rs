//! Report Run Errors
//!
//! Every failure is terminal for the current run. Configuration-class errors
//! are kept apart from transport errors so a caller can decide whether a
//! rerun could help.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = ReportError> = std::result::Result<T, E>;

/// Errors that can occur while aggregating or submitting a report
#[derive(Debug, Error)]
pub enum ReportError {
    /// A profile identifier could not be split into owner and profile
    #[error("Malformed profile identifier: {0:?} (expected owner/profile)")]
    MalformedIdentifier(String),

    /// A result file is missing or unreadable
    #[error("Failed to read scan result {path:?}: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A result file is not valid JSON
    #[error("Failed to parse scan result {path:?}: {source}")]
    ArtifactParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Two artifacts report the same profile
    #[error("Duplicate profile in run: {0}")]
    DuplicateProfile(String),

    /// No owner given and none could be derived from a server URL
    #[error("Unable to resolve report owner: {0}")]
    OwnerResolution(String),

    /// Variant is neither `chef` nor `compliance`
    #[error("Provided unknown variant: {0}")]
    UnknownVariant(String),

    /// Any other invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Platform client credentials are missing or unusable
    #[error("Platform credentials error: {0}")]
    Credentials(String),

    /// The envelope could not be encoded as JSON
    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),

    /// The request never produced an HTTP response
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Report submission rejected ({status}): {body}")]
    Submission { status: u16, body: String },
}

impl ReportError {
    /// True for errors caused by configuration; rerunning without changes
    /// will fail the same way.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ReportError::UnknownVariant(_)
                | ReportError::OwnerResolution(_)
                | ReportError::InvalidConfig(_)
                | ReportError::Credentials(_)
        )
    }

    /// True for transient transport failures a later run may get past.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReportError::Network(_) => true,
            ReportError::Submission { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        ReportError::Network(err)
    }
}
