//! Discoverer: the single producer of the harvest
//!
//! Walks the forum index page by page, up to the page limit, and queues
//! every thread it finds with the next sequence number. Threads listed on
//! index pages past the limit are never seen.

use crate::crawler::queue::{WorkItem, WorkQueue};
use crate::crawler::results::ResultSet;
use crate::crawler::source::PageSource;
use crate::HarvestError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Requester name used in the producer's request log lines
const REQUESTER: &str = "P";

/// Outcome of the discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Index pages requested, including a failed last one
    pub index_pages_visited: u32,

    /// Work items queued; also the next unused sequence number
    pub items_queued: u64,

    /// Traversal stopped on a transport or extraction error
    pub stopped_by_error: bool,

    /// Traversal stopped because the run was cancelled
    pub cancelled: bool,
}

/// Index traversal that feeds the work queue
pub struct Discoverer {
    source: Arc<PageSource>,
    queue: Arc<WorkQueue>,
    results: Arc<ResultSet>,
    start_url: Url,
    page_limit: u32,
    cancel: CancellationToken,
}

impl Discoverer {
    pub fn new(
        source: Arc<PageSource>,
        queue: Arc<WorkQueue>,
        results: Arc<ResultSet>,
        start_url: Url,
        page_limit: u32,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            queue,
            results,
            start_url,
            page_limit,
            cancel,
        }
    }

    /// Runs the discovery pass and closes the queue
    ///
    /// The queue is closed on every path out of this method, so workers
    /// always observe termination.
    pub async fn run(self) -> Result<DiscoveryReport, HarvestError> {
        tracing::info!("PRODUCER:STARTING");

        let mut report = DiscoveryReport::default();
        let outcome = self.discover(&mut report).await;
        self.queue.close();

        tracing::info!("PRODUCER:QUEUED:{}", report.items_queued);
        tracing::info!("PRODUCER:TERMINATING");

        outcome.map(|()| report)
    }

    async fn discover(&self, report: &mut DiscoveryReport) -> Result<(), HarvestError> {
        let mut next = Some(self.start_url.clone());

        while let Some(url) = next.take() {
            if report.index_pages_visited >= self.page_limit {
                tracing::debug!(
                    "PRODUCER:PAGE LIMIT {} reached before {}",
                    self.page_limit,
                    url
                );
                break;
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                fetched = self.source.index_page(&url, REQUESTER) => fetched,
            };
            report.index_pages_visited += 1;

            let page = match fetched {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!("PRODUCER:ERROR:index page {}: {}", url, e);
                    report.stopped_by_error = true;
                    break;
                }
            };

            tracing::debug!(
                "PRODUCER:PAGE {}:{} items on {}",
                report.index_pages_visited,
                page.items.len(),
                url
            );

            for reference in page.items {
                let item = WorkItem {
                    sequence: report.items_queued,
                    reference,
                };
                self.results.reserve(item.sequence);
                tracing::debug!("PRODUCER:QUEUED:{}:{}", item.sequence, item.reference);

                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        report.cancelled = true;
                        return Ok(());
                    }
                    queued = self.queue.enqueue(item) => queued?,
                }
                report.items_queued += 1;
                tracing::debug!("PRODUCER:QUEUE DEPTH:{}", self.queue.depth());
            }

            next = page.next_page;
        }

        Ok(())
    }
}
