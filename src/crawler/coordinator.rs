//! Run coordinator - harvest orchestration
//!
//! The coordinator owns one run of the pipeline:
//! - Builds the work queue and the result set
//! - Spawns the worker pool, then the discoverer
//! - Joins the discoverer, then every worker
//! - Checks that every reserved slot was filled and hands back the results

use crate::config::{Config, CrawlConfig};
use crate::crawler::discoverer::{DiscoveryReport, Discoverer};
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::parser::{ContentFragment, ForumExtractor};
use crate::crawler::queue::WorkQueue;
use crate::crawler::results::{ItemResult, ResultSet};
use crate::crawler::source::PageSource;
use crate::crawler::worker::{Worker, WorkerReport};
use crate::HarvestError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Exit code for a run where every thread was harvested in full
pub const EXIT_COMPLETE: u8 = 0;

/// Exit code for a run where some threads failed or stopped early
pub const EXIT_DEGRADED: u8 = 2;

/// Exit code for a cancelled run
pub const EXIT_CANCELLED: u8 = 3;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One result per discovered thread, in discovery order
    pub items: Vec<ItemResult>,

    pub discovery: DiscoveryReport,

    /// One report per worker, ordered by worker id
    pub workers: Vec<WorkerReport>,

    /// The run was cancelled before it finished
    pub cancelled: bool,
}

impl RunReport {
    /// Posts per thread, in discovery order
    pub fn fragments(&self) -> Vec<&[ContentFragment]> {
        self.items
            .iter()
            .map(|item| item.fragments.as_slice())
            .collect()
    }

    /// Number of threads that failed or stopped early
    pub fn degraded_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.state.is_degraded())
            .count()
    }

    /// Process exit code describing this run
    pub fn exit_code(&self) -> u8 {
        if self.cancelled {
            EXIT_CANCELLED
        } else if self.degraded_items() > 0 || self.discovery.stopped_by_error {
            EXIT_DEGRADED
        } else {
            EXIT_COMPLETE
        }
    }
}

/// Main harvest coordinator structure
pub struct Coordinator {
    source: Arc<PageSource>,
    start_url: Url,
    page_limit: u32,
    threads: usize,
    max_content_pages: Option<u32>,
    queue_capacity: Option<usize>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator using the HTTP fetcher and forum extractor
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The client, selectors or start URL were unusable
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::new(&config.http)?;
        let extractor = ForumExtractor::new(&config.selectors)?;
        let source = PageSource::new(Arc::new(fetcher), Arc::new(extractor));
        Self::with_source(source, &config.crawl)
    }

    /// Creates a coordinator around an existing page source
    ///
    /// Throttle and retry settings from `crawl` are applied to `source`.
    pub fn with_source(source: PageSource, crawl: &CrawlConfig) -> Result<Self, HarvestError> {
        let source = source
            .with_throttle(crawl.throttle)
            .with_retries(crawl.max_retries, Duration::from_millis(crawl.retry_delay_ms));

        Ok(Self {
            source: Arc::new(source),
            start_url: Url::parse(&crawl.url)?,
            page_limit: crawl.pages,
            threads: crawl.threads.max(1) as usize,
            max_content_pages: crawl.max_content_pages,
            queue_capacity: crawl.queue_capacity,
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this coordinator's runs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the harvest to completion or cancellation
    ///
    /// Per-page failures are contained in the branch that hit them and show
    /// up as item states. Only coordination failures are returned as errors.
    pub async fn run(&self) -> Result<RunReport, HarvestError> {
        let queue = Arc::new(WorkQueue::new(self.queue_capacity));
        let results = Arc::new(ResultSet::new());
        tracing::info!("INIT:work_queue:capacity {:?}", self.queue_capacity);

        let mut workers = JoinSet::new();
        for id in 0..self.threads {
            let worker = Worker::new(
                id,
                Arc::clone(&self.source),
                Arc::clone(&queue),
                Arc::clone(&results),
                self.cancel.clone(),
            )
            .with_max_content_pages(self.max_content_pages);
            workers.spawn(worker.run());
        }
        tracing::info!("INIT:CONSUMER TASKS STARTED {}", self.threads);

        let discoverer = Discoverer::new(
            Arc::clone(&self.source),
            Arc::clone(&queue),
            Arc::clone(&results),
            self.start_url.clone(),
            self.page_limit,
            self.cancel.clone(),
        );
        let producer = tokio::spawn(discoverer.run());
        tracing::info!("INIT:SINGLE PRODUCER STARTED");

        let discovery = match producer.await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Workers would otherwise wait on a queue nobody closes
                queue.close();
                Err(task_failed("producer", e))
            }
        }?;
        tracing::info!("INIT:SINGLE PRODUCER JOINED");

        let mut reports = Vec::with_capacity(self.threads);
        while let Some(joined) = workers.join_next().await {
            reports.push(joined.map_err(|e| task_failed("consumer", e))??);
        }
        reports.sort_by_key(|report| report.worker_id);
        tracing::info!("INIT:ALL CONSUMERS JOINED");

        if reports.len() != self.threads || !reports.iter().all(|r| r.observed_termination) {
            return Err(HarvestError::Coordination(format!(
                "{} of {} workers observed termination",
                reports.iter().filter(|r| r.observed_termination).count(),
                self.threads
            )));
        }

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            let filled = results.finish_cancelled();
            tracing::warn!("Run cancelled, {} threads left unharvested", filled);
        }

        if !results.is_complete() {
            return Err(HarvestError::Coordination(format!(
                "{} of {} result slots left empty after all workers joined",
                results.pending(),
                results.reserved()
            )));
        }
        let items = results.take_results()?;
        if items.len() as u64 != discovery.items_queued && !cancelled {
            return Err(HarvestError::Coordination(format!(
                "{} results for {} queued items",
                items.len(),
                discovery.items_queued
            )));
        }

        Ok(RunReport {
            items,
            discovery,
            workers: reports,
            cancelled,
        })
    }
}

fn task_failed(role: &str, error: JoinError) -> HarvestError {
    HarvestError::Coordination(format!("{} task failed: {}", role, error))
}
