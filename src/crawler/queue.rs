//! Work queue between the discoverer and the worker pool
//!
//! A FIFO of sequenced work items with a broadcast close:
//! - `enqueue` appends; with a capacity it waits for space (backpressure)
//! - `dequeue` waits for an item, or returns `None` once the queue is
//!   closed and drained
//! - `close` wakes every waiting consumer, so each worker observes the end
//!   of the queue without any sentinel being passed around

use crate::HarvestError;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, Semaphore};
use url::Url;

/// A discovered thread, tagged with its discovery sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Position in discovery order, starting at 0 with no gaps
    pub sequence: u64,

    /// Thread URL
    pub reference: Url,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<WorkItem>,
    closed: bool,
}

/// Closeable multi-consumer FIFO of `WorkItem`s
#[derive(Debug)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    available: Notify,
    capacity: Option<Semaphore>,
}

impl WorkQueue {
    /// Creates a queue; `capacity` of `None` means unbounded
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            available: Notify::new(),
            capacity: capacity.map(Semaphore::new),
        }
    }

    /// Creates an unbounded queue
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Appends an item, waiting for space on a bounded queue
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The item was queued
    /// * `Err(HarvestError::Coordination)` - The queue was already closed
    pub async fn enqueue(&self, item: WorkItem) -> Result<(), HarvestError> {
        if let Some(capacity) = &self.capacity {
            let permit = capacity.acquire().await.map_err(|_| closed_error(&item))?;
            // Returned by the consumer that dequeues the item
            permit.forget();
        }

        {
            let mut state = self.lock();
            if state.closed {
                return Err(closed_error(&item));
            }
            state.items.push_back(item);
        }

        self.available.notify_one();
        Ok(())
    }

    /// Takes the oldest item, waiting while the queue is empty and open
    ///
    /// Returns `None` once the queue is closed and every item is taken.
    pub async fn dequeue(&self) -> Option<WorkItem> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so a close between the check and the
            // await is not missed
            notified.as_mut().enable();

            let popped = {
                let mut state = self.lock();
                match state.items.pop_front() {
                    Some(item) => Some(item),
                    None if state.closed => return None,
                    None => None,
                }
            };

            if let Some(item) = popped {
                if let Some(capacity) = &self.capacity {
                    capacity.add_permits(1);
                }
                return Some(item);
            }

            notified.await;
        }
    }

    /// Marks the end of the queue and wakes every waiting consumer
    ///
    /// Idempotent. Items already queued are still handed out.
    pub fn close(&self) {
        self.lock().closed = true;
        if let Some(capacity) = &self.capacity {
            capacity.close();
        }
        self.available.notify_waiters();
    }

    /// Returns true once `close` has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of items waiting to be taken
    pub fn depth(&self) -> usize {
        self.lock().items.len()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn closed_error(item: &WorkItem) -> HarvestError {
    HarvestError::Coordination(format!(
        "work item {} enqueued after queue close",
        item.sequence
    ))
}
