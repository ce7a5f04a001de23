//! Core data types shared by the fetch, extract, and aggregate stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A sitemap URL to fetch, tagged with its position in the input list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SitemapTarget {
    /// Zero-based position in the input list.
    pub index: usize,
    /// Absolute URL of the sitemap document.
    pub url: String,
}

impl SitemapTarget {
    pub fn new(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
        }
    }

    /// Build targets from an ordered list of URLs.
    pub fn from_urls<I, S>(urls: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        urls.into_iter()
            .enumerate()
            .map(|(i, u)| Self::new(i, u))
            .collect()
    }
}

impl fmt::Display for SitemapTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// One URL entry extracted from a sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The `<loc>` text, trimmed. Never empty.
    pub url: String,
    /// The `<lastmod>` text exactly as found (trimmed, not reparsed).
    pub last_modified: Option<String>,
    /// The sitemap this record was extracted from.
    pub source_sitemap: String,
}

/// A successfully fetched sitemap document.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// URL that was requested.
    pub url: String,
    /// HTTP status code of the final response.
    pub status: u16,
    /// Declared `Content-Type`, if the server sent one.
    pub content_type: Option<String>,
    /// Raw response body.
    pub body: Vec<u8>,
}
