//! Forum-Harvest main entry point
//!
//! This is the command-line interface for the Forum-Harvest thread harvester.

use anyhow::Context;
use clap::Parser;
use forum_harvest::config::{load_config, validate, Config};
use forum_harvest::crawler::Coordinator;
use forum_harvest::output::{print_statistics, write_results, RunStatistics};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Forum-Harvest: an order-preserving forum thread harvester
///
/// Walks the index pages of a forum, fetches every listed thread with a pool
/// of workers, and writes all posts as JSON in the order the threads were
/// listed.
#[derive(Parser, Debug)]
#[command(name = "forum-harvest")]
#[command(version)]
#[command(about = "An order-preserving forum thread harvester", long_about = None)]
struct Cli {
    /// Index URL to start from [default: built-in forum index]
    #[arg(short, long)]
    url: Option<String>,

    /// Maximum number of index pages to visit [default: 20]
    #[arg(short, long)]
    pages: Option<u32>,

    /// Number of worker tasks [default: 8]
    #[arg(short, long)]
    threads: Option<u32>,

    /// Be verbose
    #[arg(short, long)]
    verbose: bool,

    /// Be more verbose
    #[arg(short, long)]
    debug: bool,

    /// Result file [default: result.json]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Optional TOML configuration file; flags override its values
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Append log records to this file; without it logs go to stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.crawl.url = url.clone();
        }
        if let Some(pages) = self.pages {
            config.crawl.pages = pages;
        }
        if let Some(threads) = self.threads {
            config.crawl.threads = threads;
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose, cli.debug, cli.log_file.as_ref()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("Harvest failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity flags
///
/// `RUST_LOG` takes precedence over the flags when it is set.
fn setup_logging(verbose: bool, debug: bool, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("forum_harvest=debug,info")
        } else if verbose {
            EnvFilter::new("forum_harvest=info,warn")
        } else {
            EnvFilter::new("warn")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

/// Loads configuration, runs the harvest and writes the result file
async fn run(cli: Cli) -> anyhow::Result<u8> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    validate(&config).context("Invalid configuration")?;
    tracing::debug!("INIT:config:{:?}", config);

    let coordinator = Coordinator::new(&config)?;

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping harvest");
            cancel.cancel();
        }
    });

    tracing::info!(
        "Harvesting {} (up to {} index pages, {} workers)",
        config.crawl.url,
        config.crawl.pages,
        config.crawl.threads
    );
    let report = coordinator.run().await?;

    println!("Writing to file {}.", config.output.path.display());
    write_results(&config.output.path, &report)
        .with_context(|| format!("Failed to write {}", config.output.path.display()))?;

    print_statistics(&RunStatistics::from_report(&report));

    let code = report.exit_code();
    if code != 0 {
        tracing::warn!(
            "Harvest finished with {} degraded threads (cancelled: {})",
            report.degraded_items(),
            report.cancelled
        );
    }
    Ok(code)
}
