//! Ember-Poll main entry point
//!
//! Command-line front end that crawls a list of URLs through the configured
//! scraping service and reports what came back.

use anyhow::Context;
use clap::Parser;
use ember_poll::config::{load_config_with_hash, Config};
use ember_poll::{BatchRunner, CrawlRequest, CrawlResult};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Ember-Poll: crawl pages through an asynchronous scraping service
///
/// Each URL is submitted as a crawl job, polled until the service reports a
/// terminal status, and the extracted page is printed or written to disk.
/// Rate limits and transient failures are retried with backoff.
#[derive(Parser, Debug)]
#[command(name = "ember-poll")]
#[command(version = "1.0.0")]
#[command(about = "Crawl pages through an asynchronous scraping service", long_about = None)]
struct Cli {
    /// URLs to crawl
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Path to TOML configuration file (defaults plus environment when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Crawl one URL at a time instead of all at once
    #[arg(long)]
    sequential: bool,

    /// Validate config and URLs without contacting the service
    #[arg(long)]
    dry_run: bool,

    /// Write each page's content into this directory
    #[arg(long, value_name = "DIR")]
    dump: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_deref())?;

    let requests = cli
        .urls
        .iter()
        .map(|url| {
            CrawlRequest::from_config(url, &config.scrape)
                .with_context(|| format!("Invalid URL: {}", url))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if cli.dry_run {
        handle_dry_run(&config, &requests);
        return Ok(());
    }

    handle_crawl(&config, requests, cli.sequential, cli.dump.as_deref()).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ember_poll=info,warn"),
            1 => EnvFilter::new("ember_poll=debug,info"),
            2 => EnvFilter::new("ember_poll=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file if given, otherwise defaults plus environment
fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            let config =
                Config::from_env().context("Failed to build configuration from environment")?;
            tracing::info!("Using default configuration with environment overrides");
            Ok(config)
        }
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, requests: &[CrawlRequest]) {
    println!("=== Ember-Poll Dry Run ===\n");

    println!("Service:");
    println!("  Endpoint: {}", config.service.endpoint);
    println!("  Request timeout: {}ms", config.service.request_timeout_ms);

    println!("\nPolling:");
    println!("  Interval: {}ms", config.polling.interval_ms);

    println!("\nRetry:");
    println!("  Transient delay: {}ms", config.retry.transient_delay_ms);
    println!("  Rate-limit delay: {}ms", config.retry.rate_limit_delay_ms);
    println!(
        "  Max transient retries: {}",
        describe_limit(config.retry.max_transient_retries)
    );
    println!(
        "  Max rate-limit retries: {}",
        describe_limit(config.retry.max_rate_limit_retries)
    );

    println!("\nBatch:");
    println!(
        "  Max concurrent jobs: {}",
        describe_limit(config.batch.max_concurrent_jobs)
    );
    println!("  On failure: {:?}", config.batch.on_failure);

    println!("\nURLs ({}):", requests.len());
    for request in requests {
        let formats: Vec<&str> = request.options().formats.iter().map(|f| f.as_str()).collect();
        println!("  - {} [{}]", request.label(), formats.join(", "));
    }

    println!("\n✓ Configuration is valid");
}

fn describe_limit(limit: Option<u32>) -> String {
    limit.map_or_else(|| "unbounded".to_string(), |n| n.to_string())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    requests: Vec<CrawlRequest>,
    sequential: bool,
    dump: Option<&Path>,
) -> anyhow::Result<()> {
    let runner = BatchRunner::from_config(config).context("Failed to create crawl client")?;

    // Ctrl-C cancels every in-flight job
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling crawl");
            on_signal.cancel();
        }
    });

    tracing::info!(
        "Crawling {} URL(s) {}",
        requests.len(),
        if sequential { "sequentially" } else { "concurrently" }
    );

    let outcome = if sequential {
        runner.run_sequential_with_cancel(requests, &cancel).await
    } else {
        runner.run_all_with_cancel(requests, &cancel).await
    };

    let stats = runner.client().stats().snapshot();

    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            println!("{}", stats);
            return Err(e.into());
        }
    };

    for result in &results {
        print_result(result);
    }

    if let Some(dir) = dump {
        dump_results(dir, &results)?;
        println!("\n✓ Pages written to: {}", dir.display());
    }

    println!("\n{}", stats);
    Ok(())
}

fn print_result(result: &CrawlResult) {
    let title = result.title().unwrap_or_else(|| "(no title)".to_string());
    println!(
        "{}  {} bytes  {}",
        result.request().label(),
        result.content().len(),
        title
    );
}

/// Writes each page's content to `<dir>/<n>-<host>.html`
fn dump_results(dir: &Path, results: &[CrawlResult]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    for (index, result) in results.iter().enumerate() {
        let host = result.request().url().host_str().unwrap_or("page");
        let path = dir.join(format!("{:03}-{}.html", index + 1, host));
        std::fs::write(&path, result.content())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Wrote {}", path.display());
    }

    Ok(())
}
