//! `sitemap-harvest harvest [INPUT]`: fetch every listed sitemap and write
//! the aggregated URL table.

use crate::acquisition::HttpFetcher;
use crate::cli::output::{self, Styled};
use crate::cli::progress;
use crate::config::HarvestConfig;
use crate::export::{self, OutputFormat};
use crate::input;
use crate::pipeline::{AggregatedResult, OrderMode, Pipeline, RunStats};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Command-line overrides layered on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct HarvestOptions {
    pub config_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub min_delay_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub ordered: bool,
    pub unique: bool,
    pub retry_server_errors: bool,
}

impl HarvestOptions {
    /// Resolve the effective configuration: defaults, then file, then flags.
    pub fn resolve(&self) -> Result<HarvestConfig> {
        let mut config = match &self.config_file {
            Some(path) => HarvestConfig::from_file(path)?,
            None => HarvestConfig::default(),
        };
        self.apply(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn apply(&self, config: &mut HarvestConfig) {
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(c) = self.concurrency {
            config.pipeline.concurrency = c;
        }
        if let Some(t) = self.timeout_ms {
            config.fetch.timeout_ms = t;
        }
        if let Some(n) = self.max_attempts {
            config.retry.max_attempts = n;
        }
        if let Some(d) = self.min_delay_ms {
            config.pipeline.min_delay_ms = d;
        }
        if let Some(ua) = &self.user_agent {
            config.fetch.user_agent = ua.clone();
        }
        if self.ordered {
            config.pipeline.order = OrderMode::Input;
        }
        if self.unique {
            config.output.unique = true;
        }
        if self.retry_server_errors {
            config.retry.retry_server_errors = true;
        }
    }
}

/// Run the harvest command.
///
/// Failed sitemaps are reported in the summary but do not make the command
/// fail; only input, configuration, and output errors do.
pub async fn run(input_path: &Path, opts: &HarvestOptions) -> Result<()> {
    let s = Styled::new();
    let quiet = output::is_quiet() || output::is_json();
    let config = opts.resolve()?;

    let list = input::load_targets(input_path)?;
    if !quiet {
        output::print_header(&s);
        for line in &list.rejected {
            eprintln!(
                "  {} line {}: skipping {:?} ({})",
                s.warn_sym(),
                line.line_no,
                line.text,
                line.reason
            );
        }
    }
    if !quiet && output::is_verbose() {
        print_settings(&config);
    }
    if list.targets.is_empty() && !quiet {
        eprintln!(
            "  {} no sitemap URLs found in {}",
            s.warn_sym(),
            input_path.display()
        );
    }

    let domain = export::domain_label(&list.targets);
    let total = list.targets.len();

    let fetcher = HttpFetcher::from_config(&config).context("failed to build HTTP client")?;
    let (tx, rx) = mpsc::unbounded_channel();
    let pipeline = Pipeline::new(Arc::new(fetcher), config.pipeline.clone())
        .context("invalid pipeline configuration")?
        .with_events(tx);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, cancelling harvest");
            on_signal.cancel();
        }
    });

    let bar = progress::create_run_bar(total, quiet);
    let reporter = progress::spawn_reporter(bar, pipeline.tracker(), rx, !quiet);

    let (result, stats) = pipeline.run(list.targets, cancel).await?;
    drop(pipeline);
    progress::join_reporter(reporter).await;

    let written = if result.records.is_empty() {
        None
    } else {
        Some(export::write_result(&result, &config.output, &domain)?)
    };

    if output::is_json() {
        print_summary_json(&result, &stats, written.as_deref());
    } else if !output::is_quiet() {
        print_summary(&s, &result, &stats, written.as_deref());
    }

    Ok(())
}

fn print_settings(config: &HarvestConfig) {
    eprintln!("  Configuration:");
    eprintln!("    concurrency:  {}", config.pipeline.concurrency);
    eprintln!("    min_delay:    {}ms", config.pipeline.min_delay_ms);
    eprintln!("    timeout:      {}ms", config.fetch.timeout_ms);
    eprintln!("    attempts:     {}", config.retry.max_attempts);
    eprintln!("    retry 5xx:    {}", config.retry.retry_server_errors);
    eprintln!("    order:        {:?}", config.pipeline.order);
    eprintln!(
        "    output:       {} ({})",
        config.output.dir.display(),
        config.output.format.extension()
    );
    eprintln!();
}

fn print_summary(s: &Styled, result: &AggregatedResult, stats: &RunStats, path: Option<&Path>) {
    eprintln!();
    eprintln!("  {}", s.bold("Harvest complete"));
    output::print_stat(
        "Sitemaps:",
        &format!("{}/{} succeeded", stats.succeeded, stats.total_targets),
    );
    output::print_stat("URLs:", &stats.total_urls.to_string());
    if stats.skipped_entries > 0 {
        output::print_stat(
            "Skipped:",
            &format!("{} entries without <loc>", stats.skipped_entries),
        );
    }
    output::print_stat("Time:", &output::format_duration_ms(stats.elapsed_ms));
    output::print_stat(
        "Rate:",
        &format!(
            "{:.1} URLs/s, {:.2} sitemaps/s",
            stats.urls_per_sec, stats.sitemaps_per_sec
        ),
    );

    if stats.total_failures > 0 {
        eprintln!();
        eprintln!(
            "  {}",
            s.red(&format!("{} sitemap(s) failed:", stats.total_failures))
        );
        for (url, failure) in result.failures() {
            eprintln!("    {} {url}  {}", s.fail_sym(), s.dim(&failure.to_string()));
        }
    }

    eprintln!();
    match path {
        Some(p) => eprintln!("  {} Results saved to {}", s.ok_sym(), p.display()),
        None => eprintln!("  {} No URLs extracted, nothing written.", s.warn_sym()),
    }
}

fn print_summary_json(result: &AggregatedResult, stats: &RunStats, path: Option<&Path>) {
    let failures: Vec<_> = result
        .failures()
        .map(|(url, f)| {
            serde_json::json!({
                "sitemap": url,
                "kind": f.kind,
                "message": f.message,
            })
        })
        .collect();

    output::print_json(&serde_json::json!({
        "outcome": stats.outcome(),
        "stats": stats,
        "failures": failures,
        "output": path.map(|p| p.display().to_string()),
    }));
}
