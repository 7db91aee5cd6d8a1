//! Archive-Pager main entry point
//!
//! This is the command-line interface for the Archive-Pager page crawler.

use archive_pager::config::{load_config_with_hash, validate, Config, OutputFormat};
use archive_pager::crawler::{crawl, RunParams, TaskSource};
use archive_pager::output::{print_report, sink_for, Sink};
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Archive-Pager: an ordered, concurrent archive page crawler
///
/// Archive-Pager fetches a contiguous range of listing pages with a pool of
/// fetch workers, extracts headline records with a pool of parse workers,
/// and writes every page in its original order.
#[derive(Parser, Debug)]
#[command(name = "archive-pager")]
#[command(version)]
#[command(about = "An ordered, concurrent archive page crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the requests that would be issued without fetching
    #[arg(long)]
    dry_run: bool,

    /// First page to fetch (overrides crawl.start_page)
    #[arg(long)]
    start: Option<u32>,

    /// Number of pages to fetch (overrides crawl.page_count)
    #[arg(long)]
    count: Option<u32>,

    /// Fetch pool size (overrides crawl.fetch_workers)
    #[arg(long)]
    fetch_workers: Option<u32>,

    /// Parse pool size (overrides crawl.parse_workers)
    #[arg(long)]
    parse_workers: Option<u32>,

    /// Output format (overrides output.format)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Output directory (overrides output.directory)
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Append log output to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(start) = self.start {
            config.crawl.start_page = start;
        }
        if let Some(count) = self.count {
            config.crawl.page_count = count;
        }
        if let Some(workers) = self.fetch_workers {
            config.crawl.fetch_workers = workers;
        }
        if let Some(workers) = self.parse_workers {
            config.crawl.parse_workers = workers;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(directory) = &self.output {
            config.output.directory = directory.display().to_string();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Overrides are validated again, exactly like file values
    cli.apply_overrides(&mut config);
    validate(&config)?;
    RunParams::from(&config.crawl).validate()?;

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_crawl(&config, config_hash, cli.quiet).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log file the output is appended to it without ANSI colors.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("archive_pager=info,warn"),
            1 => EnvFilter::new("archive_pager=debug,info"),
            2 => EnvFilter::new("archive_pager=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}

/// Opens the log file for appending, creating it when missing
fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Handles the --dry-run mode: validates config and shows the requests that would be issued
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let params = RunParams::from(&config.crawl);
    let source = TaskSource::from_config(config)?;

    println!("=== Archive-Pager Dry Run ===\n");

    println!("Run:");
    println!("  Pages: {}..={}", params.start_page, params.end_page());
    println!("  Fetch workers: {}", params.fetch_workers);
    println!("  Parse workers: {}", params.parse_workers);
    println!("  Session: {:?}", config.crawl.session);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Format: {:?}", config.output.format);

    println!("\nRequests:");
    for task in source.tasks(params.start_page, params.page_count)? {
        println!("  {} {}", task.request.method, task.request.url);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would fetch {} pages", params.page_count);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: String,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Source: {} ({} pages from page {})",
        config.source.base_url,
        config.crawl.page_count,
        config.crawl.start_page
    );

    // Run the crawler
    let outcome = match crawl(config).await {
        Ok(outcome) => {
            tracing::info!("Crawl completed successfully");
            outcome
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };
    let report = outcome.report.with_config_hash(config_hash);

    // Hand the ordered pages to the configured sink
    let sink = sink_for(config.output.format);
    let path = sink.write(&outcome.pages, &report, Path::new(&config.output.directory))?;
    tracing::info!("Wrote {}", path.display());

    if !quiet {
        println!();
        print_report(&report);
        println!("\n✓ Output written to: {}", path.display());
    }

    Ok(())
}
