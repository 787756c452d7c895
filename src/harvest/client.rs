//! HTTP client construction

use crate::config::SiteConfig;
use reqwest::Client;
use std::time::Duration;

/// Builds the stateless HTTP client shared by harvesting and detail fetching
///
/// The credential is attached per request as a `Cookie` header, so the client
/// itself keeps no cookie store and can be cloned freely across workers.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use tender_harvest::config::SiteConfig;
/// use tender_harvest::harvest::build_http_client;
///
/// let client = build_http_client(&SiteConfig::default(), Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(site: &SiteConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(site.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}
