//! HTTP Fetcher
//!
//! Downloads raw resource bytes for the engine. Retry and TLS policy belong to
//! whoever builds the client; the engine only sees `fetch(locator) -> bytes`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use super::errors::FetchError;

/// Default HTTP client timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch collaborator: turns a locator into raw bytes
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download the resource named by `locator`
    async fn fetch(&self, locator: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher backed by a shared reqwest client
#[derive(Clone)]
pub struct HttpFetcher {
    /// HTTP client for making requests
    http_client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Wrap an already configured client
    pub fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, locator: &Url) -> Result<Vec<u8>, FetchError> {
        debug!(url = %locator, "Fetching resource");

        let response = self.http_client.get(locator.clone()).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(url = %locator, status = %status, "Fetch returned error status");
            return Err(FetchError::from_status(status.as_u16(), &body));
        }

        let bytes = response.bytes().await?;

        info!(url = %locator, size = bytes.len(), "Fetched resource");
        Ok(bytes.to_vec())
    }
}
