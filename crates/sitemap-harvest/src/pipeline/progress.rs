//! Live progress accounting for a harvest run.
//!
//! One `ProgressTracker` is shared by `Arc` between every worker and any
//! reporter polling it. All counters sit behind a single short lock, so a
//! snapshot never shows half of an update.

use crate::error::Failure;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Terminal result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    AllSucceeded,
    PartialFailure,
}

/// Point-in-time statistics for a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub total_targets: usize,
    /// Targets that reached a terminal state (success or failure).
    pub processed: usize,
    pub succeeded: usize,
    pub total_failures: usize,
    pub total_urls: usize,
    /// Entries dropped because they had no usable `<loc>`.
    pub skipped_entries: usize,
    pub elapsed_ms: u64,
    pub urls_per_sec: f64,
    pub sitemaps_per_sec: f64,
    /// Set once the run has been finalised; the values no longer change.
    pub finished: bool,
}

impl RunStats {
    /// Targets not yet in a terminal state.
    pub fn remaining(&self) -> usize {
        self.total_targets.saturating_sub(self.processed)
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.total_failures == 0 {
            RunOutcome::AllSucceeded
        } else {
            RunOutcome::PartialFailure
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    total: usize,
    succeeded: usize,
    failed: usize,
    urls: usize,
    skipped: usize,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl Counters {
    fn stats(&self) -> RunStats {
        let elapsed = match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        };
        let processed = self.succeeded + self.failed;
        let secs = elapsed.as_secs_f64();
        let rate = |n: usize| if secs > 0.0 { n as f64 / secs } else { 0.0 };

        RunStats {
            total_targets: self.total,
            processed,
            succeeded: self.succeeded,
            total_failures: self.failed,
            total_urls: self.urls,
            skipped_entries: self.skipped,
            elapsed_ms: elapsed.as_millis() as u64,
            urls_per_sec: rate(self.urls),
            sitemaps_per_sec: rate(processed),
            finished: self.finished_at.is_some(),
        }
    }
}

/// Thread-safe run counters.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    inner: Mutex<Counters>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the counters and start the clock for `total` targets.
    pub fn start(&self, total: usize) {
        *self.lock() = Counters {
            total,
            started_at: Some(Instant::now()),
            ..Counters::default()
        };
    }

    pub fn record_success(&self, sitemap_url: &str, url_count: usize, skipped: usize) {
        {
            let mut c = self.lock();
            c.succeeded += 1;
            c.urls += url_count;
            c.skipped += skipped;
        }
        debug!(sitemap = sitemap_url, urls = url_count, skipped, "sitemap done");
    }

    pub fn record_failure(&self, sitemap_url: &str, failure: &Failure) {
        self.lock().failed += 1;
        debug!(sitemap = sitemap_url, kind = %failure.kind, "sitemap failed");
    }

    /// Consistent view of the counters right now.
    pub fn snapshot(&self) -> RunStats {
        self.lock().stats()
    }

    /// Freeze the clock and return the final statistics.
    pub fn finish(&self) -> RunStats {
        let mut c = self.lock();
        if c.finished_at.is_none() {
            let now = Instant::now();
            c.started_at.get_or_insert(now);
            c.finished_at = Some(now);
        }
        c.stats()
    }
}
