use std::time::Duration;

use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::error::{HOST_NOT_ALLOWED, INVALID_URL, PROXY_FAILED, SecretError};

/// Fetches arbitrary pages on behalf of an authorized secret session.
pub struct ProxyFetcher {
    client: Client,
    allowed_hosts: Vec<String>,
}

impl ProxyFetcher {
    pub fn new(timeout: Duration, allowed_hosts: Vec<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            allowed_hosts,
        })
    }

    /// Validates the target before any network access happens.
    pub fn parse_target(&self, raw: &str) -> Result<Url, SecretError> {
        let url = Url::parse(raw.trim()).map_err(|_| SecretError::BadRequest(INVALID_URL))?;

        if !self.allowed_hosts.is_empty() {
            let host = url
                .host_str()
                .map(|h| h.to_ascii_lowercase())
                .ok_or(SecretError::BadRequest(HOST_NOT_ALLOWED))?;
            if !self.allowed_hosts.iter().any(|allowed| *allowed == host) {
                return Err(SecretError::BadRequest(HOST_NOT_ALLOWED));
            }
        }

        Ok(url)
    }

    /// One GET, whole body as text. Any HTTP status counts as success; only
    /// transport and decoding failures are errors.
    pub async fn fetch(&self, url: Url) -> Result<String, SecretError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!("Proxy fetch of {} failed: {}", url, e);
            SecretError::Internal(PROXY_FAILED)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!("Proxy body read from {} failed: {}", url, e);
            SecretError::Internal(PROXY_FAILED)
        })?;

        debug!("Proxied {} ({}, {} bytes)", url, status, body.len());
        Ok(body)
    }
}
