//! Live progress display for a harvest run.
//!
//! An `indicatif` bar polls the shared [`ProgressTracker`] on a steady tick
//! while per-target result lines are printed above it as targets finish.

use crate::cli::output::Styled;
use crate::pipeline::{ProgressTracker, RunStats, TargetOutcome};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

const TICK: Duration = Duration::from_millis(120);

/// Create the run bar. Hidden when `hidden` is set (quiet or JSON mode).
pub fn create_run_bar(total: usize, hidden: bool) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if hidden {
        bar.set_draw_target(ProgressDrawTarget::hidden());
        return bar;
    }
    if let Ok(style) = ProgressStyle::with_template(
        "  {spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} sitemaps  {msg}",
    ) {
        bar.set_style(
            style
                .progress_chars("\u{2588}\u{2589}\u{2591}")
                .tick_chars("\u{25b8}\u{25b9}\u{25b8}\u{25b9}\u{25b8}"),
        );
    }
    bar.enable_steady_tick(TICK);
    bar
}

/// Bar message for a snapshot.
pub fn status_message(stats: &RunStats) -> String {
    let mut msg = format!("{} URLs", stats.total_urls);
    if stats.total_failures > 0 {
        msg.push_str(&format!(", {} failed", stats.total_failures));
    }
    msg
}

/// One line for a finished target.
pub fn outcome_line(s: &Styled, outcome: &TargetOutcome) -> String {
    match &outcome.result {
        Ok(count) => format!(
            "  {} {} {}",
            s.ok_sym(),
            outcome.target.url,
            s.dim(&format!("({count} URLs)"))
        ),
        Err(failure) => format!(
            "  {} {} {}",
            s.fail_sym(),
            outcome.target.url,
            s.red(&failure.to_string())
        ),
    }
}

/// Drive `bar` from the tracker and the event stream until the stream closes.
pub fn spawn_reporter(
    bar: ProgressBar,
    tracker: Arc<ProgressTracker>,
    mut events: mpsc::UnboundedReceiver<TargetOutcome>,
    print_lines: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let s = Styled::new();
        let mut tick = tokio::time::interval(TICK);
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(outcome) => {
                        if print_lines {
                            bar.println(outcome_line(&s, &outcome));
                        }
                        let stats = tracker.snapshot();
                        bar.set_position(stats.processed as u64);
                        bar.set_message(status_message(&stats));
                    }
                    None => break,
                },
                _ = tick.tick() => {
                    let stats = tracker.snapshot();
                    bar.set_position(stats.processed as u64);
                    bar.set_message(status_message(&stats));
                }
            }
        }
        bar.finish_and_clear();
    })
}

/// Wait for the reporter task. A panicked or aborted reporter is logged,
/// never propagated; returns whether it finished cleanly.
pub async fn join_reporter(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(err) => {
            warn!("progress reporter did not finish cleanly: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Failure, FailureKind};
    use crate::types::SitemapTarget;

    #[test]
    fn test_outcome_line() {
        let s = Styled::plain();
        let ok = TargetOutcome {
            target: SitemapTarget::new(0, "https://a.test/sitemap.xml"),
            result: Ok(12),
        };
        assert_eq!(outcome_line(&s, &ok), "  OK https://a.test/sitemap.xml (12 URLs)");

        let bad = TargetOutcome {
            target: SitemapTarget::new(1, "https://b.test/sitemap.xml"),
            result: Err(Failure::new(FailureKind::HttpError, "HTTP 404")),
        };
        assert_eq!(
            outcome_line(&s, &bad),
            "  !! https://b.test/sitemap.xml HttpError: HTTP 404"
        );
    }

    #[tokio::test]
    async fn test_reporter_stops_when_events_close() {
        let tracker = Arc::new(ProgressTracker::new());
        tracker.start(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let bar = create_run_bar(1, true);
        let handle = spawn_reporter(bar.clone(), Arc::clone(&tracker), rx, false);

        tracker.record_success("https://a.test/", 3, 0);
        tx.send(TargetOutcome {
            target: SitemapTarget::new(0, "https://a.test/"),
            result: Ok(3),
        })
        .unwrap();
        drop(tx);

        handle.await.unwrap();
        assert!(bar.is_finished());
    }

    #[tokio::test]
    async fn test_join_reporter_logs_panicked_task() {
        let handle: JoinHandle<()> = tokio::spawn(async { panic!("reporter crashed") });
        assert!(!join_reporter(handle).await);
    }

    #[tokio::test]
    async fn test_join_reporter_clean_exit() {
        let handle = tokio::spawn(async {});
        assert!(join_reporter(handle).await);
    }
}
