//! Feed document fetcher.
//!
//! One GET per feed with a fixed User-Agent, a total timeout and a size cap.
//! Every failure is logged here and reported to the caller as "nothing fetched".

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::{NewsError, Result};

/// Source of raw feed documents.
pub trait DocumentFetcher {
    /// Fetch the document at `url`, or `None` if it could not be retrieved.
    fn fetch(&self, url: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;
}

impl<F: DocumentFetcher + Sync + ?Sized> DocumentFetcher for &F {
    fn fetch(&self, url: &str) -> impl Future<Output = Option<Vec<u8>>> + Send {
        (**self).fetch(url)
    }
}

/// HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    client: Client,
    max_feed_size: u64,
}

impl HttpFetcher {
    /// Create a fetcher from the fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| NewsError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Fetch a document, returning the reason on failure.
    pub async fn try_fetch(&self, url: &str) -> Result<Vec<u8>> {
        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NewsError::Fetch(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(NewsError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(NewsError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NewsError::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(NewsError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        Ok(bytes.to_vec())
    }
}

impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        match self.try_fetch(url).await {
            Ok(bytes) => {
                debug!("Fetched {} bytes from {}", bytes.len(), url);
                Some(bytes)
            }
            Err(e) => {
                warn!("Fetch of {} failed: {}", url, e);
                None
            }
        }
    }
}

/// Check that a URL is absolute http(s) with a host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| NewsError::Fetch(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(NewsError::Fetch(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(NewsError::Fetch("URL has no host".to_string()));
    }
    Ok(())
}
