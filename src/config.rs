//! Report Configuration
//!
//! Plain configuration structs, validated once when built. Nothing here
//! talks to the network.

use crate::error::{ReportError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default base used when no compliance server is configured
pub const DEFAULT_LOCAL_URL: &str = "https://localhost";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Compliance server flavor, which decides the submission path layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Compliance server colocated behind the platform server
    #[default]
    Chef,
    /// Standalone compliance server
    Compliance,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Chef => write!(f, "chef"),
            Variant::Compliance => write!(f, "compliance"),
        }
    }
}

impl FromStr for Variant {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chef" => Ok(Variant::Chef),
            "compliance" => Ok(Variant::Compliance),
            other => Err(ReportError::UnknownVariant(other.to_string())),
        }
    }
}

/// HTTP client settings shared by both auth paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Verify server TLS certificates
    pub verify_tls: bool,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Identity of this node against the platform server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Platform server URL, usually ending in `/organizations/<org>`
    pub server_url: Option<Url>,
    /// API client name used to sign requests
    pub client_name: Option<String>,
    /// RSA private key (PEM) used to sign requests
    pub client_key: Option<PathBuf>,
}

/// Everything a report run needs besides the run entries themselves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Compliance server base URL; `None` posts to the local default
    pub server: Option<Url>,
    pub variant: Variant,
    /// Bearer token; `None` selects the platform client
    pub token: Option<String>,
    /// Explicit owner; `None` derives it from a server URL
    pub owner: Option<String>,
    /// Reported node name override
    pub node: Option<String>,
    /// Reported environment override
    pub environment: Option<String>,
    pub platform: PlatformConfig,
    pub http: HttpConfig,
}

impl ReportConfig {
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Whether the bearer-token path will be used
    pub fn uses_token(&self) -> bool {
        self.token.is_some()
    }
}

/// Collects raw (string) settings and validates them into a [`ReportConfig`]
#[derive(Debug, Clone, Default)]
pub struct ReportConfigBuilder {
    server: Option<String>,
    port: Option<u16>,
    variant: Option<String>,
    token: Option<String>,
    owner: Option<String>,
    node: Option<String>,
    environment: Option<String>,
    platform_url: Option<String>,
    client_name: Option<String>,
    client_key: Option<PathBuf>,
    verify_tls: Option<bool>,
    timeout_secs: Option<u64>,
}

impl ReportConfigBuilder {
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Override the port of the compliance server URL
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn platform_url(mut self, url: impl Into<String>) -> Self {
        self.platform_url = Some(url.into());
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn client_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_key = Some(path.into());
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = Some(verify);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Validate all settings.
    ///
    /// Blank strings count as unset, so an empty `COMPLIANCE_TOKEN` selects
    /// the platform client just like a missing one.
    pub fn build(self) -> Result<ReportConfig> {
        let variant = match non_blank(self.variant) {
            Some(v) => v.parse::<Variant>()?,
            None => Variant::default(),
        };

        let mut server = non_blank(self.server)
            .map(|s| parse_url("server", &s))
            .transpose()?;

        if let Some(port) = self.port {
            match server.as_mut() {
                Some(url) => url
                    .set_port(Some(port))
                    .map_err(|_| ReportError::InvalidConfig(format!("cannot set port on {}", url)))?,
                None => {
                    return Err(ReportError::InvalidConfig(
                        "port given without a server".to_string(),
                    ))
                }
            }
        }

        let platform_url = non_blank(self.platform_url)
            .map(|s| parse_url("platform server", &s))
            .transpose()?;

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ReportError::InvalidConfig(
                "timeout must be at least one second".to_string(),
            ));
        }

        Ok(ReportConfig {
            server,
            variant,
            token: non_blank(self.token),
            owner: non_blank(self.owner),
            node: non_blank(self.node),
            environment: non_blank(self.environment),
            platform: PlatformConfig {
                server_url: platform_url,
                client_name: non_blank(self.client_name),
                client_key: self.client_key,
            },
            http: HttpConfig {
                verify_tls: self.verify_tls.unwrap_or(true),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_url(what: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| ReportError::InvalidConfig(format!("invalid {} URL {:?}: {}", what, value, e)))?;

    if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() {
        Ok(url)
    } else {
        Err(ReportError::InvalidConfig(format!(
            "{} URL must be http(s) with a host: {}",
            what, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parse() {
        assert_eq!("chef".parse::<Variant>().unwrap(), Variant::Chef);
        assert_eq!("compliance".parse::<Variant>().unwrap(), Variant::Compliance);
        assert_eq!(Variant::Compliance.to_string(), "compliance");

        let err = "bogus".parse::<Variant>().unwrap_err();
        assert!(matches!(err, ReportError::UnknownVariant(ref v) if v == "bogus"));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_defaults() {
        let config = ReportConfig::builder().build().unwrap();

        assert_eq!(config.variant, Variant::Chef);
        assert!(config.server.is_none());
        assert!(!config.uses_token());
        assert!(config.http.verify_tls);
        assert_eq!(config.http.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_blank_token_selects_platform_client() {
        let config = ReportConfig::builder().token("   ").build().unwrap();
        assert!(config.token.is_none());
        assert!(!config.uses_token());

        let config = ReportConfig::builder().token("abc").build().unwrap();
        assert!(config.uses_token());
    }

    #[test]
    fn test_unknown_variant_rejected_at_build() {
        let err = ReportConfig::builder()
            .server("https://compliance.example.com")
            .token("abc")
            .variant("bogus")
            .build()
            .unwrap_err();

        assert!(matches!(err, ReportError::UnknownVariant(_)));
    }

    #[test]
    fn test_port_override() {
        let config = ReportConfig::builder()
            .server("https://compliance.example.com/api")
            .port(8443)
            .build()
            .unwrap();

        assert_eq!(
            config.server.unwrap().as_str(),
            "https://compliance.example.com:8443/api"
        );
    }

    #[test]
    fn test_port_without_server_rejected() {
        let err = ReportConfig::builder().port(8443).build().unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_urls_rejected() {
        for bad in ["not a url", "ftp://files.example.com", "file:///tmp/x"] {
            let err = ReportConfig::builder().server(bad).build().unwrap_err();
            assert!(matches!(err, ReportError::InvalidConfig(_)), "{}", bad);
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ReportConfig::builder().timeout_secs(0).build().unwrap_err();
        assert!(err.is_config_error());
    }
}
