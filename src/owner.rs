//! Owner Resolution
//!
//! Reports are filed under an owner (organization or user). An explicit
//! owner always wins; otherwise it is the trailing path segment of the
//! server identity URL, e.g. `https://chef.example.com/organizations/acme`.

use crate::error::{ReportError, Result};
use reqwest::Url;
use tracing::debug;

/// Resolve the owner a report is submitted under.
pub fn resolve_owner(explicit: Option<&str>, identity: Option<&Url>) -> Result<String> {
    if let Some(owner) = explicit.map(str::trim).filter(|o| !o.is_empty()) {
        return Ok(owner.to_string());
    }

    let url = identity.ok_or_else(|| {
        ReportError::OwnerResolution("no owner given and no server URL configured".to_string())
    })?;

    let owner = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or_else(|| {
            ReportError::OwnerResolution(format!("server URL has no path to derive an owner from: {}", url))
        })?;

    debug!(owner = %owner, server = %url, "Derived owner from server URL");
    Ok(owner.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_explicit_owner_wins() {
        let server = url("https://host/org/myorg");
        assert_eq!(resolve_owner(Some("admin"), Some(&server)).unwrap(), "admin");
        assert_eq!(resolve_owner(Some("admin"), None).unwrap(), "admin");
    }

    #[test]
    fn test_derived_from_last_segment() {
        let server = url("https://host/org/myorg");
        assert_eq!(resolve_owner(None, Some(&server)).unwrap(), "myorg");

        let trailing = url("https://chef.example.com/organizations/acme/");
        assert_eq!(resolve_owner(None, Some(&trailing)).unwrap(), "acme");
    }

    #[test]
    fn test_blank_explicit_owner_falls_back() {
        let server = url("https://host/org/myorg");
        assert_eq!(resolve_owner(Some("  "), Some(&server)).unwrap(), "myorg");
    }

    #[test]
    fn test_unresolvable_owner() {
        let err = resolve_owner(None, None).unwrap_err();
        assert!(matches!(err, ReportError::OwnerResolution(_)));

        let bare = url("https://localhost:443");
        let err = resolve_owner(None, Some(&bare)).unwrap_err();
        assert!(matches!(err, ReportError::OwnerResolution(_)));
    }
}
