//! Crawler module: the harvest pipeline
//!
//! This module contains the concurrent core, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - HTML extraction behind the `Extractor` trait
//! - The work queue with its broadcast close
//! - The discoverer (single producer) and the worker pool (consumers)
//! - The ordered result set and the run coordinator

mod coordinator;
mod discoverer;
mod fetcher;
mod parser;
mod queue;
mod results;
mod source;
mod worker;

#[cfg(test)]
mod testing;

pub use coordinator::{Coordinator, RunReport, EXIT_CANCELLED, EXIT_COMPLETE, EXIT_DEGRADED};
pub use discoverer::{DiscoveryReport, Discoverer};
pub use fetcher::{build_http_client, FetchedPage, Fetcher, HttpFetcher};
pub use parser::{ContentFragment, ContentPage, Extractor, ForumExtractor, IndexPage};
pub use queue::{WorkItem, WorkQueue};
pub use results::{ItemResult, ResultSet};
pub use source::PageSource;
pub use worker::{Worker, WorkerReport};

use crate::config::Config;
use crate::HarvestError;
use tokio_util::sync::CancellationToken;

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Build the HTTP client and the extractor from the configuration
/// 2. Start the worker pool and the discoverer
/// 3. Wait for both and assemble the results in discovery order
///
/// # Arguments
///
/// * `config` - A validated configuration
/// * `cancel` - Token that stops the run early; the report is marked cancelled
///
/// # Example
///
/// ```no_run
/// use forum_harvest::config::Config;
/// use forum_harvest::crawler::harvest;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = harvest(&Config::default(), CancellationToken::new()).await?;
/// println!("{} threads harvested", report.items.len());
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: &Config, cancel: CancellationToken) -> Result<RunReport, HarvestError> {
    Coordinator::new(config)?
        .with_cancellation(cancel)
        .run()
        .await
}
