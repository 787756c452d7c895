//! Tender-Harvest: a resumable harvester for session-gated listing sites
//!
//! This crate bootstraps a session past a JavaScript browser challenge, replays
//! the captured search query over plain HTTP to collect listing links, and then
//! fetches every detail page with bounded concurrency, checkpointing progress so
//! an interrupted run resumes where it stopped.

pub mod config;
pub mod crawler;
pub mod harvest;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Tender-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Links file not found at {path}, run the links stage first")]
    MissingLinks { path: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Tender-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use session::{Credential, QueryTemplate};
pub use state::{DetailRecord, LinkRecord, ProgressState};
