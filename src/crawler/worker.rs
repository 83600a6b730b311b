//! Worker: one consumer of the work queue
//!
//! A worker takes one thread at a time and follows its "next page" links
//! until none remain, collecting posts in page order. The finished result is
//! written into the slot for the item's sequence number. Failures end the
//! thread early but never skip its slot.

use crate::crawler::queue::{WorkItem, WorkQueue};
use crate::crawler::results::{ItemResult, ResultSet};
use crate::crawler::source::PageSource;
use crate::state::ItemState;
use crate::HarvestError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a worker did before it exited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,

    /// Items dequeued and written to the result set
    pub items_processed: u64,

    /// The worker left its loop because the queue was closed and drained
    pub observed_termination: bool,
}

/// Queue consumer that paginates through threads
pub struct Worker {
    id: usize,
    source: Arc<PageSource>,
    queue: Arc<WorkQueue>,
    results: Arc<ResultSet>,
    max_content_pages: Option<u32>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        id: usize,
        source: Arc<PageSource>,
        queue: Arc<WorkQueue>,
        results: Arc<ResultSet>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            source,
            queue,
            results,
            max_content_pages: None,
            cancel,
        }
    }

    /// Caps the number of pages followed per thread
    pub fn with_max_content_pages(mut self, max_content_pages: Option<u32>) -> Self {
        self.max_content_pages = max_content_pages;
        self
    }

    /// Drains the queue until it is closed
    ///
    /// # Returns
    ///
    /// * `Ok(WorkerReport)` - The worker observed the end of the queue
    /// * `Err(HarvestError::Coordination)` - A result slot was missing or
    ///   already filled
    pub async fn run(self) -> Result<WorkerReport, HarvestError> {
        tracing::info!("CONSUMER:{}:STARTING", self.id);

        let mut items_processed = 0;
        while let Some(item) = self.queue.dequeue().await {
            tracing::debug!(
                "CONSUMER:{}:RECURSING ON:({}, {})",
                self.id,
                item.sequence,
                item.reference
            );

            let result = if self.cancel.is_cancelled() {
                ItemResult::cancelled()
            } else {
                self.harvest(&item).await
            };

            tracing::debug!(
                "CONSUMER:{}:DONE WITH:({}, {}):{} fragments, {}",
                self.id,
                item.sequence,
                item.reference,
                result.fragments.len(),
                result.state
            );
            self.results.set(item.sequence, result)?;
            items_processed += 1;
        }

        tracing::info!("CONSUMER:{}:EOQ", self.id);
        tracing::info!("CONSUMER:{}:DEQUEUED:{}", self.id, items_processed);
        tracing::info!("CONSUMER:{}:TERMINATING", self.id);

        Ok(WorkerReport {
            worker_id: self.id,
            items_processed,
            observed_termination: true,
        })
    }

    /// Follows one thread's pages until there is no next page
    async fn harvest(&self, item: &WorkItem) -> ItemResult {
        let requester = self.id.to_string();
        let mut fragments = Vec::new();
        let mut pages_visited = 0;
        let mut seen = HashSet::new();
        let mut next = Some(item.reference.clone());

        let state = loop {
            let Some(url) = next.take() else {
                break ItemState::Complete;
            };

            if !seen.insert(url.clone()) {
                tracing::warn!(
                    "CONSUMER:{}:LOOP:thread {} links back to {}",
                    self.id,
                    item.sequence,
                    url
                );
                break ItemState::Complete;
            }

            if let Some(cap) = self.max_content_pages {
                if pages_visited >= cap {
                    tracing::warn!(
                        "CONSUMER:{}:CAP:thread {} stopped after {} pages",
                        self.id,
                        item.sequence,
                        cap
                    );
                    break ItemState::Partial;
                }
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break ItemState::Cancelled,
                fetched = self.source.content_page(&url, &requester) => fetched,
            };

            match fetched {
                Ok(page) => {
                    pages_visited += 1;
                    fragments.extend(page.fragments);
                    next = page.next_page;
                }
                Err(e) => {
                    tracing::warn!(
                        "CONSUMER:{}:ERROR:thread {} page {}: {}",
                        self.id,
                        item.sequence,
                        url,
                        e
                    );
                    break if pages_visited == 0 {
                        ItemState::Failed
                    } else {
                        ItemState::Partial
                    };
                }
            }
        };

        ItemResult {
            fragments,
            state,
            pages_visited,
        }
    }
}
