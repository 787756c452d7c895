use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Tender-Harvest
///
/// Every section falls back to its defaults, so an empty file (or no file at
/// all) describes the stock setup for the public transaction listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub filter: FilterConfig,
    pub crawler: CrawlerConfig,
    pub harvest: HarvestConfig,
    pub bootstrap: BootstrapConfig,
    pub output: OutputConfig,
}

/// Endpoints and anti-bot signals of the target site
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Search endpoint replayed by the link harvester
    #[serde(rename = "api-url")]
    pub api_url: String,

    /// Listing page that serves the browser challenge
    #[serde(rename = "page-url")]
    pub page_url: String,

    /// Base used to resolve relative detail paths
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Title / body substrings that mean the challenge has been passed
    #[serde(rename = "success-markers")]
    pub success_markers: Vec<String>,

    /// HTTP status the site answers with when the credential is rejected
    #[serde(rename = "challenge-status")]
    pub challenge_status: u16,

    /// User agent shared by the browser and the HTTP client
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.cqggzy.com/inteligentsearch/rest/esinteligentsearch/getFullTextDataNew"
                .to_string(),
            page_url: "https://www.cqggzy.com/jyxx/transaction_detail.html".to_string(),
            base_url: "https://www.cqggzy.com".to_string(),
            success_markers: vec!["公共资源".to_string(), "交易".to_string()],
            challenge_status: 521,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Search filters applied through the UI before the query is captured
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Title keyword (empty means all)
    pub keyword: String,

    /// Administrative region facet
    pub region: String,

    /// Business type facet
    #[serde(rename = "biz-type")]
    pub biz_type: String,

    /// Information type facet
    #[serde(rename = "info-type")]
    pub info_type: String,

    /// Publish time facet
    #[serde(rename = "time-period")]
    pub time_period: String,

    /// Records per search page (`rn`)
    #[serde(rename = "page-size")]
    pub page_size: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            region: String::new(),
            biz_type: String::new(),
            info_type: "交易结果".to_string(),
            time_period: "近三月".to_string(),
            page_size: 20,
        }
    }
}

impl FilterConfig {
    /// Facet labels in the order they are clicked, skipping empty ones
    pub fn facets(&self) -> Vec<&str> {
        [
            self.info_type.as_str(),
            self.time_period.as_str(),
            self.region.as_str(),
            self.biz_type.as_str(),
        ]
        .into_iter()
        .filter(|label| !label.is_empty())
        .collect()
    }
}

/// Detail fetch engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of detail fetches in flight
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: u32,

    /// Processed items between two checkpoints
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: u32,

    /// Per-attempt request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Attempts per detail page before it is recorded as failed
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Fixed delay between two attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// How many times a details run may rebootstrap after credential rejection
    #[serde(rename = "max-session-renewals")]
    pub max_session_renewals: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            checkpoint_interval: 10,
            request_timeout_secs: 15,
            max_retries: 3,
            retry_delay_ms: 1000,
            max_session_renewals: 1,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Paginated link harvester configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Attempts per search page before it is skipped
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Backoff unit; attempt `n` waits `n` units before the next try
    #[serde(rename = "backoff-unit-ms")]
    pub backoff_unit_ms: u64,

    /// Pause between two consecutive pages
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_unit_ms: 1000,
            page_delay_ms: 300,
        }
    }
}

/// Session bootstrap configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Title polls before giving up on the challenge
    #[serde(rename = "poll-attempts")]
    pub poll_attempts: u32,

    /// Delay between two title polls (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// How long to wait for the search request after the UI actions
    #[serde(rename = "capture-timeout-secs")]
    pub capture_timeout_secs: u64,

    /// Settle time after each UI action (milliseconds)
    #[serde(rename = "action-delay-ms")]
    pub action_delay_ms: u64,

    /// Run the browser without a window
    pub headless: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            poll_attempts: 15,
            poll_interval_ms: 2000,
            capture_timeout_secs: 10,
            action_delay_ms: 1500,
            headless: false,
        }
    }
}

impl BootstrapConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding every file the harvester reads or writes
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

impl OutputConfig {
    pub fn links_path(&self) -> PathBuf {
        self.dir.join("links.json")
    }

    pub fn progress_path(&self) -> PathBuf {
        self.dir.join("progress.json")
    }

    pub fn details_json_path(&self) -> PathBuf {
        self.dir.join("details.json")
    }

    pub fn details_csv_path(&self) -> PathBuf {
        self.dir.join("details.csv")
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.join("cookies.json")
    }
}
