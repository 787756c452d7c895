//! Integration tests for the harvester
//!
//! HTTP behavior runs against wiremock servers; the fetch engine runs against
//! in-memory detail sources so concurrency and crash points are controllable.

mod common;
mod engine_tests;
mod fetch_tests;
mod pipeline_tests;
