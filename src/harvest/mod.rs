//! Paginated link harvesting over plain HTTP

mod client;
mod harvester;

pub use client::build_http_client;
pub use harvester::{HarvestReport, Harvester, PageError, SkippedPage};
