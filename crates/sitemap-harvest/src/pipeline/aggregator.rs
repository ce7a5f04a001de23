//! Thread-safe accumulation of per-sitemap results.

use crate::error::Failure;
use crate::types::UrlRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Order of records in the final result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    /// Sitemaps appear in the order they finished.
    #[default]
    Completion,
    /// Sitemaps appear in input-list order.
    Input,
}

/// What happened to one sitemap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapStatus {
    /// Records extracted.
    pub url_count: usize,
    /// Entries skipped for lack of a usable `<loc>`.
    pub skipped_entries: usize,
    /// Set when fetching or parsing failed.
    pub failure: Option<Failure>,
}

impl SitemapStatus {
    pub fn success(url_count: usize, skipped_entries: usize) -> Self {
        Self {
            url_count,
            skipped_entries,
            failure: None,
        }
    }

    pub fn failed(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Merge a second status for the same URL (duplicate input lines).
    fn absorb(&mut self, other: SitemapStatus) {
        self.url_count += other.url_count;
        self.skipped_entries += other.skipped_entries;
        if self.failure.is_none() {
            self.failure = other.failure;
        }
    }
}

/// Final, immutable output of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedResult {
    /// Every extracted record; duplicates are kept.
    pub records: Vec<UrlRecord>,
    /// Status of every sitemap that reached a terminal state.
    pub statuses: BTreeMap<String, SitemapStatus>,
}

impl AggregatedResult {
    /// Failed sitemaps with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &Failure)> {
        self.statuses
            .iter()
            .filter_map(|(url, s)| s.failure.as_ref().map(|f| (url.as_str(), f)))
    }

    /// Records extracted from one sitemap.
    pub fn records_from<'a>(&'a self, sitemap: &'a str) -> impl Iterator<Item = &'a UrlRecord> {
        self.records
            .iter()
            .filter(move |r| r.source_sitemap == sitemap)
    }
}

struct Batch {
    index: usize,
    records: Vec<UrlRecord>,
}

#[derive(Default)]
struct State {
    batches: Vec<Batch>,
    statuses: BTreeMap<String, SitemapStatus>,
}

/// Append-only collector shared by all workers.
pub struct Aggregator {
    order: OrderMode,
    state: Mutex<State>,
}

impl Aggregator {
    pub fn new(order: OrderMode) -> Self {
        Self {
            order,
            state: Mutex::new(State::default()),
        }
    }

    /// Record the result for the sitemap at input position `index`.
    pub fn append(
        &self,
        index: usize,
        sitemap_url: &str,
        records: Vec<UrlRecord>,
        status: SitemapStatus,
    ) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.statuses.get_mut(sitemap_url) {
            Some(existing) => existing.absorb(status),
            None => {
                state.statuses.insert(sitemap_url.to_string(), status);
            }
        }
        if !records.is_empty() {
            state.batches.push(Batch { index, records });
        }
    }

    /// Take everything collected so far as the final result.
    pub fn finalize(&self) -> AggregatedResult {
        let State {
            mut batches,
            statuses,
        } = std::mem::take(&mut *self.state.lock().unwrap_or_else(PoisonError::into_inner));

        if self.order == OrderMode::Input {
            batches.sort_by_key(|b| b.index);
        }

        let total = batches.iter().map(|b| b.records.len()).sum();
        let mut records = Vec::with_capacity(total);
        for batch in batches {
            records.extend(batch.records);
        }

        AggregatedResult { records, statuses }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use std::sync::Arc;

    fn records(sitemap: &str, urls: &[&str]) -> Vec<UrlRecord> {
        urls.iter()
            .map(|u| UrlRecord {
                url: u.to_string(),
                last_modified: None,
                source_sitemap: sitemap.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_completion_order() {
        let agg = Aggregator::new(OrderMode::Completion);
        agg.append(1, "s1", records("s1", &["b"]), SitemapStatus::success(1, 0));
        agg.append(0, "s0", records("s0", &["a"]), SitemapStatus::success(1, 0));

        let result = agg.finalize();
        let urls: Vec<_> = result.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "a"]);
    }

    #[test]
    fn test_input_order() {
        let agg = Aggregator::new(OrderMode::Input);
        agg.append(2, "s2", records("s2", &["c1", "c2"]), SitemapStatus::success(2, 0));
        agg.append(0, "s0", records("s0", &["a"]), SitemapStatus::success(1, 0));
        agg.append(1, "s1", records("s1", &["b"]), SitemapStatus::success(1, 0));

        let result = agg.finalize();
        let urls: Vec<_> = result.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b", "c1", "c2"]);
    }

    #[test]
    fn test_failures_tracked_in_status_map() {
        let agg = Aggregator::new(OrderMode::Completion);
        agg.append(0, "ok", records("ok", &["a", "b"]), SitemapStatus::success(2, 1));
        agg.append(
            1,
            "bad",
            Vec::new(),
            SitemapStatus::failed(Failure::new(FailureKind::NetworkError, "refused")),
        );

        let result = agg.finalize();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.statuses.len(), 2);
        assert!(result.statuses["ok"].is_success());
        assert_eq!(result.statuses["ok"].skipped_entries, 1);

        let failures: Vec<_> = result.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "bad");
        assert_eq!(failures[0].1.kind, FailureKind::NetworkError);
        assert_eq!(result.records_from("ok").count(), 2);
    }

    #[test]
    fn test_duplicate_sitemap_statuses_merge() {
        let agg = Aggregator::new(OrderMode::Completion);
        agg.append(0, "s", records("s", &["a"]), SitemapStatus::success(1, 0));
        agg.append(3, "s", records("s", &["a"]), SitemapStatus::success(1, 2));

        let result = agg.finalize();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.statuses["s"], SitemapStatus::success(2, 2));
    }

    #[test]
    fn test_concurrent_appends() {
        let agg = Arc::new(Aggregator::new(OrderMode::Input));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let agg = Arc::clone(&agg);
                std::thread::spawn(move || {
                    let name = format!("s{i}");
                    let recs = records(&name, &["x", "y", "z"]);
                    agg.append(i, &name, recs, SitemapStatus::success(3, 0));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let result = agg.finalize();
        assert_eq!(result.records.len(), 24);
        assert_eq!(result.statuses.len(), 8);
        assert_eq!(result.records[0].source_sitemap, "s0");
        assert_eq!(result.records[23].source_sitemap, "s7");
    }
}
