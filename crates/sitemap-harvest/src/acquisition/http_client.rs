//! Thin reqwest wrapper used for sitemap downloads.

use crate::config::FetchConfig;
use crate::error::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::time::Duration;

/// Accept header sent with every sitemap request.
const ACCEPT_SITEMAP: &str = "text/html,application/xml;q=0.9,*/*;q=0.8";

/// Raw HTTP response. Any status is a valid response here; the caller
/// decides what counts as a failure.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Shared HTTP client. Cheap to clone; connections are pooled.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    max_body_bytes: u64,
}

impl HttpClient {
    /// Build a client from fetch settings.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_SITEMAP));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// GET `url` and read the whole body.
    ///
    /// Returns `Err` for transport failures and for bodies larger than
    /// `max_body_bytes`; HTTP error statuses come back as a normal response.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        // Chunks arrive already decoded, so the limit also bounds
        // `Content-Encoding: gzip` bodies.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_body_bytes {
                return Err(FetchError::BodyTooLarge {
                    limit: self.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse {
            url: url.to_string(),
            status,
            content_type,
            body,
        })
    }
}
