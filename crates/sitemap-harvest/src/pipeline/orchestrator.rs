//! Bounded worker pool driving fetch → extract → aggregate for every target.

use super::aggregator::{AggregatedResult, Aggregator, SitemapStatus};
use super::progress::{ProgressTracker, RunOutcome, RunStats};
use super::rate_limiter::RateLimiter;
use crate::acquisition::Fetcher;
use crate::config::PipelineConfig;
use crate::error::{ConfigError, Failure, FailureKind, PipelineError};
use crate::extraction::{self, Extraction};
use crate::types::SitemapTarget;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Lifecycle of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Running,
    AllSucceeded,
    PartialFailure,
    Done,
}

impl From<RunOutcome> for PipelineState {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::AllSucceeded => Self::AllSucceeded,
            RunOutcome::PartialFailure => Self::PartialFailure,
        }
    }
}

/// Sent once per target when it reaches a terminal state.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub target: SitemapTarget,
    /// Number of records extracted, or why the target failed.
    pub result: Result<usize, Failure>,
}

/// Runs one harvest over a list of sitemap targets.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    config: PipelineConfig,
    tracker: Arc<ProgressTracker>,
    state: Mutex<PipelineState>,
    outcome: Mutex<Option<RunOutcome>>,
    events: Option<mpsc::UnboundedSender<TargetOutcome>>,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: PipelineConfig) -> Result<Self, ConfigError> {
        if config.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(0));
        }
        Ok(Self {
            fetcher,
            config,
            tracker: Arc::new(ProgressTracker::new()),
            state: Mutex::new(PipelineState::Idle),
            outcome: Mutex::new(None),
            events: None,
        })
    }

    /// Receive a [`TargetOutcome`] for every finished target.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<TargetOutcome>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Shared progress counters, safe to poll while the run is in flight.
    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Terminal outcome, once the run has finished.
    pub fn outcome(&self) -> Option<RunOutcome> {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: PipelineState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Fetch and extract every target, at most `concurrency` at a time.
    ///
    /// Per-target failures never abort the run. Once `cancel` fires no new
    /// targets are dispatched; targets already in flight finish on their own
    /// and the rest are recorded as [`FailureKind::Cancelled`].
    pub async fn run(
        &self,
        targets: Vec<SitemapTarget>,
        cancel: CancellationToken,
    ) -> Result<(AggregatedResult, RunStats), PipelineError> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != PipelineState::Idle {
                return Err(PipelineError::AlreadyStarted);
            }
            *state = PipelineState::Running;
        }

        let total = targets.len();
        self.tracker.start(total);
        info!(
            targets = total,
            concurrency = self.config.concurrency,
            "starting harvest"
        );

        let worker = Worker {
            fetcher: Arc::clone(&self.fetcher),
            aggregator: Arc::new(Aggregator::new(self.config.order)),
            tracker: Arc::clone(&self.tracker),
            events: self.events.clone(),
        };
        let limiter = RateLimiter::new(self.config.concurrency, self.config.min_delay_ms);

        let mut in_flight: Vec<(SitemapTarget, JoinHandle<()>)> = Vec::with_capacity(total);
        let mut pending = targets.into_iter();
        let mut undispatched = Vec::new();

        while let Some(target) = pending.next() {
            let guard = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                guard = limiter.acquire() => guard.ok(),
            };
            let Some(guard) = guard else {
                undispatched.push(target);
                undispatched.extend(pending.by_ref());
                break;
            };

            let task_worker = worker.clone();
            let task_target = target.clone();
            let handle = tokio::spawn(async move {
                let _guard = guard;
                task_worker.process(task_target).await;
            });
            in_flight.push((target, handle));
        }

        if !undispatched.is_empty() {
            info!(
                skipped = undispatched.len(),
                "harvest cancelled, not dispatching remaining targets"
            );
            for target in undispatched {
                worker.report(&target, Err(Failure::cancelled()));
            }
        }

        for (target, handle) in in_flight {
            if let Err(err) = handle.await {
                error!(url = %target.url, "worker did not complete: {err}");
                let failure = Failure::new(FailureKind::WorkerPanic, err.to_string());
                worker.report(&target, Err(failure));
            }
        }

        let result = worker.aggregator.finalize();
        let stats = self.tracker.finish();
        let outcome = stats.outcome();

        self.set_state(outcome.into());
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        info!(
            succeeded = stats.succeeded,
            failed = stats.total_failures,
            urls = stats.total_urls,
            elapsed_ms = stats.elapsed_ms,
            "harvest finished"
        );
        self.set_state(PipelineState::Done);

        Ok((result, stats))
    }
}

/// Per-target work, cloned into every spawned task.
#[derive(Clone)]
struct Worker {
    fetcher: Arc<dyn Fetcher>,
    aggregator: Arc<Aggregator>,
    tracker: Arc<ProgressTracker>,
    events: Option<mpsc::UnboundedSender<TargetOutcome>>,
}

impl Worker {
    async fn process(&self, target: SitemapTarget) {
        let outcome = match self.fetcher.fetch(&target).await {
            Ok(doc) => extraction::extract(&doc.body, &target.url).map_err(|e| Failure::from(&e)),
            Err(err) => Err(Failure::from(&err)),
        };
        self.report(&target, outcome);
    }

    fn report(&self, target: &SitemapTarget, outcome: Result<Extraction, Failure>) {
        let event = match outcome {
            Ok(Extraction { records, skipped }) => {
                let count = records.len();
                self.aggregator.append(
                    target.index,
                    &target.url,
                    records,
                    SitemapStatus::success(count, skipped),
                );
                self.tracker.record_success(&target.url, count, skipped);
                Ok(count)
            }
            Err(failure) => {
                if failure.kind != FailureKind::Cancelled {
                    warn!(url = %target.url, "{failure}");
                }
                self.aggregator.append(
                    target.index,
                    &target.url,
                    Vec::new(),
                    SitemapStatus::failed(failure.clone()),
                );
                self.tracker.record_failure(&target.url, &failure);
                Err(failure)
            }
        };

        if let Some(tx) = &self.events {
            let _ = tx.send(TargetOutcome {
                target: target.clone(),
                result: event,
            });
        }
    }
}
