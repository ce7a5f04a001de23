//! Extraction layer: turns fetched sitemap bytes into
//! [`UrlRecord`](crate::types::UrlRecord)s.

pub mod gzip;
pub mod sitemap_parser;

pub use sitemap_parser::{parse_sitemap, Extraction};

use crate::error::ExtractError;

/// Extract every entry from a sitemap body, inflating gzip first if needed.
pub fn extract(content: &[u8], source_sitemap: &str) -> Result<Extraction, ExtractError> {
    if gzip::is_gzip(content) {
        let inflated = gzip::inflate(content)
            .map_err(|e| ExtractError::malformed(format!("gzip body could not be inflated: {e}")))?;
        return parse_sitemap(&inflated, source_sitemap);
    }
    parse_sitemap(content, source_sitemap)
}
