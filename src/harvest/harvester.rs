//! Paginated link harvester
//!
//! Replays the captured search request over plain HTTP. Page 0 reports the
//! total, the remaining pages are fetched one after another on the same
//! client and credential.
//!
//! # Page Failure Policy
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP error status | Retry with backoff (attempt × unit), then skip page |
//! | Timeout / connection error | Retry with backoff, then skip page |
//! | Undecodable body | Retry with backoff, then skip page |
//! | Non-200 `code` in body | Skip page immediately, zero records |
//! | Challenge status | Stop harvesting, report credential invalidated |

use crate::config::{HarvestConfig, SiteConfig};
use crate::output::category_distribution;
use crate::parser::{clean_api_record, parse_api_response, ApiPage};
use crate::session::{Credential, QueryTemplate};
use crate::state::LinkRecord;
use reqwest::header::COOKIE;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Why one search page produced no records
#[derive(Debug, Error)]
pub enum PageError {
    #[error("API error: code={code:?} msg={msg}")]
    ApiError { code: Option<i64>, msg: String },

    #[error("HTTP {0}")]
    Http(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Undecodable response: {0}")]
    Decode(String),

    #[error("Credential rejected with challenge status {0}")]
    CredentialInvalid(u16),
}

impl PageError {
    /// Whether another attempt at the same page can help
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PageError::Http(_) | PageError::Transport(_) | PageError::Decode(_)
        )
    }
}

/// A page that yielded no records, kept so gaps are visible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPage {
    /// Zero-based page cursor
    pub cursor: u32,
    pub reason: String,
}

/// Result of one harvest
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    /// Links in server order, deduplicated by id
    pub links: Vec<LinkRecord>,

    /// Total reported by the first page
    pub total: u64,

    /// Pages the total implies
    pub pages: u32,

    pub skipped_pages: Vec<SkippedPage>,

    /// Harvesting stopped early on a challenge status
    pub credential_invalidated: bool,
}

impl HarvestReport {
    pub fn is_complete(&self) -> bool {
        self.skipped_pages.is_empty() && !self.credential_invalidated
    }

    /// Count of links per category, largest first
    pub fn categories(&self) -> Vec<(String, usize)> {
        category_distribution(self.links.iter().map(|link| link.category.as_str()))
    }
}

/// Paginated replay of a captured search query
#[derive(Debug, Clone)]
pub struct Harvester {
    client: Client,
    site: SiteConfig,
    page_size: u32,
    config: HarvestConfig,
}

impl Harvester {
    pub fn new(client: Client, site: SiteConfig, page_size: u32, config: HarvestConfig) -> Self {
        Self {
            client,
            site,
            page_size: page_size.max(1),
            config,
        }
    }

    /// Collects every link the query matches
    ///
    /// Never fails as a whole: page-level failures are retried, then recorded
    /// in [`HarvestReport::skipped_pages`] while harvesting continues.
    pub async fn harvest(&self, template: &QueryTemplate, credential: &Credential) -> HarvestReport {
        let mut report = HarvestReport::default();
        let mut collector = LinkCollector::new(&self.site.base_url);

        let first = match self.fetch_page(template, credential, 0).await {
            Ok(page) => page,
            Err(e) => {
                self.record_failure(&mut report, 0, e);
                return report;
            }
        };

        report.total = first.total;
        report.pages = pages_for(first.total, self.page_size);
        collector.absorb(&first.records);
        tracing::info!(
            total = report.total,
            pages = report.pages,
            "Search reports {} records over {} pages",
            report.total,
            report.pages
        );

        for cursor in 1..report.pages {
            tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;

            match self.fetch_page(template, credential, cursor).await {
                Ok(page) => collector.absorb(&page.records),
                Err(e) => {
                    let stop = matches!(e, PageError::CredentialInvalid(_));
                    self.record_failure(&mut report, cursor, e);
                    if stop {
                        break;
                    }
                }
            }

            let done = cursor + 1;
            if done % 10 == 0 || done == report.pages {
                tracing::info!(
                    page = done,
                    "{}/{} pages ({} links so far)",
                    done,
                    report.pages,
                    collector.len()
                );
            }
        }

        report.links = collector.finish();
        report
    }

    fn record_failure(&self, report: &mut HarvestReport, cursor: u32, error: PageError) {
        if matches!(error, PageError::CredentialInvalid(_)) {
            report.credential_invalidated = true;
            tracing::warn!(page = cursor, "Credential rejected, stopping harvest: {}", error);
        } else {
            tracing::warn!(page = cursor, "Skipping page: {}", error);
        }
        report.skipped_pages.push(SkippedPage {
            cursor,
            reason: error.to_string(),
        });
    }

    /// Fetches one page, retrying retryable failures with linear backoff
    async fn fetch_page(
        &self,
        template: &QueryTemplate,
        credential: &Credential,
        cursor: u32,
    ) -> Result<ApiPage, PageError> {
        let body = template.page_body(cursor, self.page_size);
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 1;

        loop {
            match self.request_page(&body, credential).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::debug!(page = cursor, attempt, "Page request failed: {}", e);
                    let backoff = self.config.backoff_unit_ms * u64::from(attempt);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_page(&self, body: &Value, credential: &Credential) -> Result<ApiPage, PageError> {
        let response = self
            .client
            .post(&self.site.api_url)
            .header(COOKIE, credential.cookie_header())
            .json(body)
            .send()
            .await
            .map_err(|e| PageError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == self.site.challenge_status {
            return Err(PageError::CredentialInvalid(status.as_u16()));
        }
        if !status.is_success() {
            return Err(PageError::Http(status.as_u16()));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| PageError::Decode(e.to_string()))?;

        parse_api_response(&envelope).map_err(|e| PageError::ApiError {
            code: e.code,
            msg: e.msg,
        })
    }
}

/// Number of pages needed for `total` records
fn pages_for(total: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    u32::try_from(total.div_ceil(page_size)).unwrap_or(u32::MAX)
}

/// Cleans raw records and drops repeated ids, first occurrence wins
struct LinkCollector<'a> {
    base_url: &'a str,
    seen: HashSet<String>,
    links: Vec<LinkRecord>,
}

impl<'a> LinkCollector<'a> {
    fn new(base_url: &'a str) -> Self {
        Self {
            base_url,
            seen: HashSet::new(),
            links: Vec::new(),
        }
    }

    fn absorb(&mut self, records: &[Value]) {
        for raw in records {
            let link = clean_api_record(raw, self.base_url);
            // Records without an id fall back to their detail URL as key
            let key = if link.id.is_empty() {
                link.detail_url.clone()
            } else {
                link.id.clone()
            };
            if key.is_empty() || self.seen.insert(key) {
                self.links.push(link);
            }
        }
    }

    fn len(&self) -> usize {
        self.links.len()
    }

    fn finish(self) -> Vec<LinkRecord> {
        self.links
    }
}
