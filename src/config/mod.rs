//! Configuration module for Tender-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`Config`] is immutable and handed to each component's entry point.
//!
//! # Example
//!
//! ```no_run
//! use tender_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Page size: {}", config.filter.page_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BootstrapConfig, Config, CrawlerConfig, FilterConfig, HarvestConfig, OutputConfig,
    SiteConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, content_hash, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
