//! HTTP Transport
//!
//! Shared reqwest client setup and response handling for both auth paths.

use crate::config::HttpConfig;
use crate::error::{ReportError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("compliance-report/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used for uploads.
///
/// Redirects are not followed; a 3xx answer is a rejected submission.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    if !config.verify_tls {
        warn!("TLS certificate verification is disabled for report uploads");
    }

    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.timeout)
        .redirect(Policy::none())
        .danger_accept_invalid_certs(!config.verify_tls)
        .build()
        .map_err(|e| ReportError::InvalidConfig(format!("failed to build HTTP client: {}", e)))
}

/// Headers every upload carries
pub fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// POST `body` to `url` with a bearer token.
pub async fn post_bearer(client: &Client, url: &Url, token: &str, body: Vec<u8>) -> Result<()> {
    let mut headers = json_headers();
    let auth = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ReportError::InvalidConfig("token contains invalid header characters".to_string()))?;
    headers.insert(AUTHORIZATION, auth);

    debug!(url = %url, bytes = body.len(), "Posting report with bearer token");

    let response = client.post(url.clone()).headers(headers).body(body).send().await?;

    check_response(response).await
}

/// Turn a non-success status into [`ReportError::Submission`].
pub async fn check_response(response: Response) -> Result<()> {
    let status = response.status();

    if status.is_success() {
        debug!(status = %status, "Report accepted");
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(ReportError::Submission {
        status: status.as_u16(),
        body,
    })
}
