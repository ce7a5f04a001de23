//! The harvest pipeline: bounded-concurrency fetch, extract, and aggregate.

pub mod aggregator;
pub mod orchestrator;
pub mod progress;
pub mod rate_limiter;

pub use aggregator::{AggregatedResult, Aggregator, OrderMode, SitemapStatus};
pub use orchestrator::{Pipeline, PipelineState, TargetOutcome};
pub use progress::{ProgressTracker, RunOutcome, RunStats};
pub use rate_limiter::{RateLimitGuard, RateLimiter};
