//! Configuration module for Forum-Harvest
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Command-line flags are applied on top of the loaded
//! values by the binary, which then validates the merged result.
//!
//! # Example
//!
//! ```no_run
//! use forum_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvest will visit up to {} index pages", config.crawl.pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, HttpConfig, OutputConfig, SelectorConfig, DEFAULT_ROOT_URL,
};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
