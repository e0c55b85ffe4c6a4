//! Report Submission
//!
//! Uploads a finished envelope. A non-empty bearer token selects the token
//! path; without one the report goes through the platform client. There are
//! no retries: one failed attempt ends the run.

pub mod http;
pub mod signed;

pub use signed::SignedClient;

use crate::config::{HttpConfig, Variant};
use crate::context::ReportEnvelope;
use crate::endpoint::Endpoint;
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

/// The platform's own authenticated API client
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// POST a JSON body to `endpoint`.
    async fn post(&self, endpoint: &Endpoint, body: Vec<u8>) -> Result<()>;
}

/// Which auth path a submission took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRoute {
    Bearer,
    Platform,
}

impl AuthRoute {
    /// Token presence alone decides the route.
    pub fn for_token(token: Option<&str>) -> Self {
        match token {
            Some(t) if !t.trim().is_empty() => AuthRoute::Bearer,
            _ => AuthRoute::Platform,
        }
    }
}

impl std::fmt::Display for AuthRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthRoute::Bearer => write!(f, "bearer"),
            AuthRoute::Platform => write!(f, "platform"),
        }
    }
}

/// Where and how a report is sent
#[derive(Clone)]
pub struct SubmissionTarget {
    pub endpoint: Endpoint,
    pub variant: Variant,
    pub owner: String,
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for SubmissionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionTarget")
            .field("endpoint", &self.endpoint)
            .field("variant", &self.variant)
            .field("owner", &self.owner)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SubmissionTarget {
    pub fn route(&self) -> AuthRoute {
        AuthRoute::for_token(self.auth_token.as_deref())
    }
}

/// Uploads report envelopes
pub struct Submitter {
    client: Client,
    platform: Option<Box<dyn PlatformClient>>,
}

impl Submitter {
    /// Create a submitter for the bearer-token path.
    pub fn new(http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(http)?,
            platform: None,
        })
    }

    /// Attach the client used when no token is configured.
    pub fn with_platform_client(mut self, platform: Box<dyn PlatformClient>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Upload `envelope` to `target`, returning the route taken.
    pub async fn submit(&self, target: &SubmissionTarget, envelope: &ReportEnvelope) -> Result<AuthRoute> {
        let body = serde_json::to_vec(envelope)?;
        let route = target.route();

        info!(
            endpoint = %target.endpoint,
            owner = %target.owner,
            variant = %target.variant,
            route = %route,
            profiles = envelope.profiles.len(),
            "Submitting compliance report"
        );

        match (route, target.auth_token.as_deref()) {
            (AuthRoute::Bearer, Some(token)) => {
                http::post_bearer(&self.client, target.endpoint.url(), token.trim(), body).await?
            }
            _ => {
                let platform = self.platform.as_ref().ok_or_else(|| {
                    ReportError::Credentials("no token and no platform client configured".to_string())
                })?;
                platform.post(&target.endpoint, body).await?
            }
        }

        info!(endpoint = %target.endpoint, "Compliance report submitted");
        Ok(route)
    }
}
