//! Submission Endpoint
//!
//! Builds the URL a report is posted to. Templates are appended to the
//! server's base path segment by segment, so the owner is always encoded as
//! a single path segment.

use crate::config::{Variant, DEFAULT_LOCAL_URL};
use crate::error::{ReportError, Result};
use reqwest::Url;

/// A fully-qualified submission URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Endpoint on a compliance server, laid out according to `variant`.
    ///
    /// - `compliance`: `{server}/owners/{owner}/inspec`
    /// - `chef`: `{server}/chef/organizations/{owner}/inspec`
    pub fn for_server(server: &Url, variant: Variant, owner: &str) -> Result<Self> {
        match variant {
            Variant::Compliance => append(server.clone(), &["owners", owner, "inspec"]),
            Variant::Chef => append(server.clone(), &["chef", "organizations", owner, "inspec"]),
        }
    }

    /// Endpoint used when no compliance server is configured:
    /// `{origin}/organizations/{owner}/inspec` on the platform server, or on
    /// the local default when that is unknown too.
    pub fn local(platform: Option<&Url>, owner: &str) -> Result<Self> {
        let mut base = match platform {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_LOCAL_URL)
                .map_err(|e| ReportError::InvalidConfig(e.to_string()))?,
        };
        base.set_path("");

        append(base, &["organizations", owner, "inspec"])
    }

    /// Pick the endpoint for a run: the variant layout when a server is
    /// configured, the local default otherwise.
    pub fn resolve(
        server: Option<&Url>,
        platform: Option<&Url>,
        variant: Variant,
        owner: &str,
    ) -> Result<Self> {
        match server {
            Some(server) => Self::for_server(server, variant, owner),
            None => Self::local(platform, owner),
        }
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn into_url(self) -> Url {
        self.url
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn append(mut url: Url, segments: &[&str]) -> Result<Endpoint> {
    if segments.iter().any(|s| s.is_empty() || s.contains('/')) {
        return Err(ReportError::InvalidConfig(format!(
            "owner must be a single path segment: {:?}",
            segments
        )));
    }

    url.set_query(None);
    url.set_fragment(None);

    url.path_segments_mut()
        .map_err(|_| ReportError::InvalidConfig("server URL cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(segments);

    Ok(Endpoint { url })
}
