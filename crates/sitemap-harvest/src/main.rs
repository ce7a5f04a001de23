use anyhow::Result;
use clap::{Parser, Subcommand};
use sitemap_harvest::cli::{harvest_cmd, logging, parse_cmd};
use sitemap_harvest::export::OutputFormat;
use sitemap_harvest::input::DEFAULT_INPUT;
use std::path::PathBuf;

/// Fetch sitemaps concurrently and collect every listed URL.
#[derive(Parser)]
#[command(name = "sitemap-harvest", version, about)]
struct Cli {
    /// Suppress progress and summary output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Verbose output and debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every sitemap listed in INPUT and write the URL table
    Harvest {
        /// File with one sitemap URL per line
        #[arg(default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(long, short)]
        output_dir: Option<PathBuf>,

        /// Output format
        #[arg(long, short, value_enum)]
        format: Option<OutputFormat>,

        /// Maximum sitemaps fetched at once
        #[arg(long, short)]
        concurrency: Option<usize>,

        /// Per-request timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Total attempts per sitemap, including the first
        #[arg(long)]
        attempts: Option<u32>,

        /// Minimum delay between request starts in milliseconds
        #[arg(long)]
        delay: Option<u64>,

        /// User-Agent header
        #[arg(long)]
        user_agent: Option<String>,

        /// Keep records in input order instead of completion order
        #[arg(long)]
        ordered: bool,

        /// Drop duplicate URLs, keeping the first occurrence
        #[arg(long)]
        unique: bool,

        /// Also retry 5xx responses
        #[arg(long)]
        retry_server_errors: bool,
    },

    /// Parse a local sitemap file and print its entries
    Parse {
        /// Sitemap XML file (plain or gzip)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.quiet {
        std::env::set_var("SITEMAP_HARVEST_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("SITEMAP_HARVEST_VERBOSE", "1");
    }
    if cli.json {
        std::env::set_var("SITEMAP_HARVEST_JSON", "1");
    }
    if cli.no_color {
        std::env::set_var("SITEMAP_HARVEST_NO_COLOR", "1");
    }

    logging::init(cli.verbose, cli.log_json);

    match cli.command {
        Command::Harvest {
            input,
            config,
            output_dir,
            format,
            concurrency,
            timeout,
            attempts,
            delay,
            user_agent,
            ordered,
            unique,
            retry_server_errors,
        } => {
            let opts = harvest_cmd::HarvestOptions {
                config_file: config,
                output_dir,
                format,
                concurrency,
                timeout_ms: timeout,
                max_attempts: attempts,
                min_delay_ms: delay,
                user_agent,
                ordered,
                unique,
                retry_server_errors,
            };
            harvest_cmd::run(&input, &opts).await
        }
        Command::Parse { file } => parse_cmd::run(&file),
    }
}
