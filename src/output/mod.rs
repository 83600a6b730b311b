//! Output module for harvest results
//!
//! This module handles:
//! - Writing the ordered results as a JSON array of threads
//! - Summarising a run for the terminal

mod json;
pub mod stats;

pub use json::{write_results, write_results_to};
pub use stats::{print_statistics, RunStatistics};
