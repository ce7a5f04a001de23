//! Write the aggregated result to a timestamped file.
//!
//! Files are named `[domain]_urls_YYYYMMDD_HHMMSS.<ext>` inside the output
//! directory, where `domain` is the host of the first input sitemap.

pub mod writers;

use crate::config::OutputConfig;
use crate::pipeline::AggregatedResult;
use crate::types::{SitemapTarget, UrlRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// Output table format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `url,last_modified,source_sitemap` with a header row.
    #[default]
    Csv,
    /// One JSON object per line.
    Jsonl,
    /// One URL per line.
    Txt,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
            Self::Txt => "txt",
        }
    }
}

/// Host of the first target without a leading `www.`, or `sitemaps`.
pub fn domain_label(targets: &[SitemapTarget]) -> String {
    targets
        .first()
        .and_then(|t| url::Url::parse(&t.url).ok())
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "sitemaps".to_string())
}

/// `[domain]_urls_YYYYMMDD_HHMMSS.<ext>`
pub fn output_filename(domain: &str, format: OutputFormat, at: DateTime<Local>) -> String {
    format!(
        "{domain}_urls_{}.{}",
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Keep the first occurrence of every URL.
pub fn unique_records(records: &[UrlRecord]) -> Vec<&UrlRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.url.as_str()))
        .collect()
}

/// Write `result` under `config.dir` and return the file path.
pub fn write_result(
    result: &AggregatedResult,
    config: &OutputConfig,
    domain: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("failed to create output directory: {}", config.dir.display()))?;

    let path = config
        .dir
        .join(output_filename(domain, config.format, Local::now()));
    let file = File::create(&path)
        .with_context(|| format!("failed to create output file: {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let records: Vec<&UrlRecord> = if config.unique {
        unique_records(&result.records)
    } else {
        result.records.iter().collect()
    };

    match config.format {
        OutputFormat::Csv => writers::write_csv(&mut out, &records),
        OutputFormat::Jsonl => writers::write_jsonl(&mut out, &records),
        OutputFormat::Txt => writers::write_text(&mut out, &records),
    }
    .and_then(|()| out.flush().map_err(Into::into))
    .with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), rows = records.len(), "wrote results");
    Ok(path)
}
