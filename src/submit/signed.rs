//! Platform API Client
//!
//! Posts through the platform server's own request signing, so no bearer
//! token is needed. The node authenticates with its client name and RSA key
//! using `X-Ops-*` headers (sign version 1.3, SHA-256).

use super::http::{build_client, check_response, json_headers};
use super::PlatformClient;
use crate::config::{HttpConfig, PlatformConfig};
use crate::endpoint::Endpoint;
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use jsonwebtoken::{crypto, Algorithm, EncodingKey};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::fs;
use tracing::debug;

/// Signing protocol version sent in `X-Ops-Sign`
pub const SIGN_VERSION: &str = "1.3";

/// Server API version requested
pub const SERVER_API_VERSION: &str = "1";

/// Maximum length of one `X-Ops-Authorization-N` header value
const AUTH_CHUNK: usize = 60;

/// API client authenticating as this node
pub struct SignedClient {
    client: Client,
    client_name: String,
    key: EncodingKey,
}

impl SignedClient {
    /// Create a client from a name and a PEM-encoded RSA private key.
    pub fn new(client: Client, client_name: impl Into<String>, key_pem: &[u8]) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(key_pem)
            .map_err(|e| ReportError::Credentials(format!("invalid client key: {}", e)))?;

        Ok(Self {
            client,
            client_name: client_name.into(),
            key,
        })
    }

    /// Load the node's credentials from configuration.
    pub fn from_config(platform: &PlatformConfig, http: &HttpConfig) -> Result<Self> {
        let client_name = platform
            .client_name
            .as_deref()
            .ok_or_else(|| ReportError::Credentials("no client name configured".to_string()))?;

        let key_path = platform
            .client_key
            .as_ref()
            .ok_or_else(|| ReportError::Credentials("no client key configured".to_string()))?;

        let key_pem = fs::read(key_path).map_err(|e| {
            ReportError::Credentials(format!("failed to read client key {:?}: {}", key_path, e))
        })?;

        debug!(client = %client_name, key = ?key_path, "Loaded platform credentials");

        Self::new(build_client(http)?, client_name, &key_pem)
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Compute the signed headers for a request.
    pub fn sign(&self, method: &str, path: &str, body: &[u8], timestamp: &str) -> Result<Vec<(String, String)>> {
        let content_hash = STANDARD.encode(Sha256::digest(body));
        let canonical = canonical_request(method, path, &content_hash, timestamp, &self.client_name);

        let signature = crypto::sign(canonical.as_bytes(), &self.key, Algorithm::RS256)
            .map_err(|e| ReportError::Credentials(format!("failed to sign request: {}", e)))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map(|raw| STANDARD.encode(raw))
            .map_err(|e| ReportError::Credentials(format!("malformed signature: {}", e)))?;

        let mut headers = vec![
            ("X-Ops-Sign".to_string(), format!("algorithm=sha256;version={}", SIGN_VERSION)),
            ("X-Ops-Userid".to_string(), self.client_name.clone()),
            ("X-Ops-Timestamp".to_string(), timestamp.to_string()),
            ("X-Ops-Content-Hash".to_string(), content_hash),
            ("X-Ops-Server-API-Version".to_string(), SERVER_API_VERSION.to_string()),
        ];

        for (i, chunk) in signature.as_bytes().chunks(AUTH_CHUNK).enumerate() {
            // base64 output is ASCII, so chunks are valid UTF-8
            headers.push((
                format!("X-Ops-Authorization-{}", i + 1),
                String::from_utf8_lossy(chunk).into_owned(),
            ));
        }

        Ok(headers)
    }
}

#[async_trait]
impl PlatformClient for SignedClient {
    async fn post(&self, endpoint: &Endpoint, body: Vec<u8>) -> Result<()> {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let path = canonical_path(endpoint.path());

        let mut headers = json_headers();
        for (name, value) in self.sign("POST", &path, &body, &timestamp)? {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ReportError::Credentials(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| ReportError::Credentials(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        debug!(url = %endpoint, client = %self.client_name, bytes = body.len(), "Posting report with platform credentials");

        let response = self
            .client
            .post(endpoint.url().clone())
            .headers(headers)
            .body(body)
            .send()
            .await?;

        check_response(response).await
    }
}

/// The string that gets signed, one `Key:value` per line
pub fn canonical_request(
    method: &str,
    path: &str,
    content_hash: &str,
    timestamp: &str,
    client_name: &str,
) -> String {
    [
        format!("Method:{}", method.to_uppercase()),
        format!("Path:{}", path),
        format!("X-Ops-Content-Hash:{}", content_hash),
        format!("X-Ops-Sign:version={}", SIGN_VERSION),
        format!("X-Ops-Timestamp:{}", timestamp),
        format!("X-Ops-UserId:{}", client_name),
        format!("X-Ops-Server-API-Version:{}", SERVER_API_VERSION),
    ]
    .join("\n")
}

/// Collapse repeated slashes and drop a trailing slash.
pub fn canonical_path(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    format!("/{}", joined)
}
