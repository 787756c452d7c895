//! Storage module for persisting harvest data
//!
//! This module handles every durable file the harvester owns:
//! - the progress checkpoint of the detail fetch
//! - the harvested link list
//! - the session snapshot (credential and captured query)
//!
//! All writes go through [`write_bytes_atomic`].

mod json_store;

pub use json_store::{
    load_links, read_json, save_links, write_bytes_atomic, write_json_atomic, ProgressStore,
    TEMP_SUFFIX,
};

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt file {path}: {message}")]
    CorruptFile { path: String, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
