//! Resumable concurrent fetch engine
//!
//! This module contains the detail fetching logic, including:
//! - HTTP fetching with retry logic and failure classification
//! - The shared work queue
//! - Worker coordination, merging and checkpointing

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::{Coordinator, EngineReport};
pub use fetcher::{DetailSource, FetchError, HttpDetailSource};
pub use scheduler::WorkQueue;
