//! Run statistics
//!
//! Summarises a finished run for the terminal: thread outcomes, post
//! counts, and how the work was spread over the pool.

use crate::crawler::RunReport;
use crate::state::ItemState;
use std::collections::HashMap;

/// Harvest statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    /// Index pages requested by the discoverer
    pub index_pages_visited: u32,

    /// Threads discovered and queued
    pub items_queued: u64,

    /// Count of threads by final state
    pub items_by_state: HashMap<ItemState, u64>,

    /// Thread pages fetched across all workers
    pub content_pages: u64,

    /// Posts collected across all threads
    pub fragments: u64,

    /// Items processed per worker, indexed by worker id
    pub items_per_worker: Vec<u64>,

    pub cancelled: bool,
}

impl RunStatistics {
    /// Builds statistics from a run report
    pub fn from_report(report: &RunReport) -> Self {
        let mut items_by_state = HashMap::new();
        for item in &report.items {
            *items_by_state.entry(item.state).or_insert(0) += 1;
        }

        Self {
            index_pages_visited: report.discovery.index_pages_visited,
            items_queued: report.discovery.items_queued,
            items_by_state,
            content_pages: report
                .items
                .iter()
                .map(|item| u64::from(item.pages_visited))
                .sum(),
            fragments: report
                .items
                .iter()
                .map(|item| item.fragments.len() as u64)
                .sum(),
            items_per_worker: report.workers.iter().map(|w| w.items_processed).collect(),
            cancelled: report.cancelled,
        }
    }

    /// Number of threads in the given state
    pub fn count(&self, state: ItemState) -> u64 {
        self.items_by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Prints statistics to stdout in a formatted way
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Index pages visited: {}", stats.index_pages_visited);
    println!("Threads queued: {}", stats.items_queued);
    println!("Thread pages fetched: {}", stats.content_pages);
    println!("Posts collected: {}", stats.fragments);

    println!("\nThreads by state:");
    for state in ItemState::all_states() {
        let count = stats.count(state);
        if count > 0 {
            println!("  {:<10} {}", state.as_str(), count);
        }
    }

    println!("\nWorkers ({}):", stats.items_per_worker.len());
    for (id, items) in stats.items_per_worker.iter().enumerate() {
        println!("  {:>3}: {} threads", id, items);
    }

    if stats.cancelled {
        println!("\n⚠ Run was cancelled, output is partial");
    }
}
