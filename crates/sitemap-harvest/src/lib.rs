//! sitemap-harvest: fetch a list of sitemaps concurrently, extract every
//! `<loc>` entry, and aggregate the results into one table.
//!
//! The core is the [`pipeline`]: a bounded pool of workers driving
//! [`acquisition`] (HTTP fetch with retry) and [`extraction`] (streaming,
//! namespace-agnostic sitemap parsing), reporting into a shared
//! [`pipeline::Aggregator`] and [`pipeline::ProgressTracker`].

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod extraction;
pub mod input;
pub mod pipeline;
pub mod types;

pub use config::HarvestConfig;
pub use error::{ExtractError, FailureKind, FetchError};
pub use pipeline::{AggregatedResult, Pipeline, RunStats};
pub use types::{SitemapTarget, UrlRecord};
