//! Sitemap fetching with typed failures and retry.

use super::http_client::HttpClient;
use super::retry::RetryPolicy;
use crate::config::HarvestConfig;
use crate::error::FetchError;
use crate::types::{FetchedDocument, SitemapTarget};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Outcome of fetching one sitemap.
pub type FetchResult = Result<FetchedDocument, FetchError>;

/// Source of sitemap documents.
///
/// Implementations must never panic on network trouble; every failure comes
/// back as a [`FetchError`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, target: &SitemapTarget) -> FetchResult;
}

/// HTTP fetcher: one GET per attempt, retried per [`RetryPolicy`].
pub struct HttpFetcher {
    client: HttpClient,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(client: HttpClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Build the client and policy from a full configuration.
    pub fn from_config(config: &HarvestConfig) -> Result<Self, FetchError> {
        let client = HttpClient::new(&config.fetch)?;
        Ok(Self::new(client, config.retry.clone()))
    }

    async fn fetch_once(&self, url: &str) -> FetchResult {
        let resp = self.client.get(url).await?;
        if resp.status >= 400 {
            return Err(FetchError::Http {
                status: resp.status,
            });
        }
        Ok(FetchedDocument {
            url: resp.url,
            status: resp.status,
            content_type: resp.content_type,
            body: resp.body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &SitemapTarget) -> FetchResult {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.fetch_once(&target.url).await {
                Ok(doc) => {
                    debug!(
                        url = %target.url,
                        status = doc.status,
                        bytes = doc.body.len(),
                        attempts,
                        "fetched sitemap"
                    );
                    return Ok(doc);
                }
                Err(err) if self.retry.should_retry(attempts, &err) => {
                    let delay = self.retry.backoff_for(attempts);
                    warn!(
                        url = %target.url,
                        attempt = attempts,
                        "fetch failed ({err}), retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    debug!(url = %target.url, attempts, "giving up: {err}");
                    return Err(err);
                }
            }
        }
    }
}
