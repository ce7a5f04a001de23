//! Load the list of sitemap URLs to harvest.
//!
//! One URL per line. Blank lines and `#` comments are ignored; lines that are
//! not absolute http(s) URLs are rejected and reported, never passed on.

use crate::types::SitemapTarget;
use anyhow::{Context, Result};
use std::path::Path;
use url::Url;

/// Default input file name.
pub const DEFAULT_INPUT: &str = "sitemap_urls.txt";

/// A line that was dropped during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based line number.
    pub line_no: usize,
    pub text: String,
    pub reason: String,
}

/// Parsed input: accepted targets in file order, plus rejected lines.
#[derive(Debug, Clone, Default)]
pub struct TargetList {
    pub targets: Vec<SitemapTarget>,
    pub rejected: Vec<RejectedLine>,
}

/// Read and parse an input file.
pub fn load_targets(path: &Path) -> Result<TargetList> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file: {}", path.display()))?;
    Ok(parse_targets(&text))
}

/// Parse input text into targets.
pub fn parse_targets(text: &str) -> TargetList {
    let mut list = TargetList::default();

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match check_url(line) {
            Ok(()) => {
                let index = list.targets.len();
                list.targets.push(SitemapTarget::new(index, line));
            }
            Err(reason) => list.rejected.push(RejectedLine {
                line_no: i + 1,
                text: line.to_string(),
                reason,
            }),
        }
    }

    list
}

fn check_url(s: &str) -> Result<(), String> {
    let url = Url::parse(s).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(())
}
