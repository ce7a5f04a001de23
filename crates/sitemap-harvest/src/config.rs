//! Harvest configuration.
//!
//! Built-in defaults, optionally overlaid by a JSON config file, then by CLI
//! flags. Durations are integer milliseconds throughout.

use crate::acquisition::retry::RetryPolicy;
use crate::error::ConfigError;
use crate::export::OutputFormat;
use crate::extraction::gzip::MAX_INFLATED_BYTES;
use crate::pipeline::OrderMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of sitemaps fetched at once.
pub const DEFAULT_CONCURRENCY: usize = 10;
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub pipeline: PipelineConfig,
    pub fetch: FetchConfig,
    pub retry: RetryPolicy,
    pub output: OutputConfig,
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of targets in flight.
    pub concurrency: usize,
    /// Minimum delay between two request starts.
    pub min_delay_ms: u64,
    /// Order of records in the final result.
    pub order: OrderMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            min_delay_ms: 0,
            order: OrderMode::Completion,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub user_agent: String,
    /// Largest response body accepted, measured after transfer decoding.
    pub max_body_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            user_agent: format!("sitemap-harvest/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: MAX_INFLATED_BYTES,
        }
    }
}

/// Where and how the aggregated table is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub format: OutputFormat,
    /// Drop repeated URLs, keeping the first occurrence.
    pub unique: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            format: OutputFormat::Csv,
            unique: false,
        }
    }
}

impl HarvestConfig {
    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(0));
        }
        if self.fetch.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.fetch.max_body_bytes == 0 {
            return Err(ConfigError::InvalidBodyLimit);
        }
        self.retry.validate()
    }
}
