use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Archive-Pager
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    pub output: OutputConfig,
}

/// Where the listing pages live and how pagination is encoded
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Listing URL without pagination parameters
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Query parameter carrying the page number
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Query parameter carrying the page size
    #[serde(rename = "page-size-param", default = "default_page_size_param")]
    pub page_size_param: String,

    /// Number of items requested per page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Fixed query parameters appended to every request
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the header value: `CrawlerName/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// How the HTTP session is shared between fetch workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// One connection-pooled client used by every fetch worker
    #[default]
    Shared,
    /// A dedicated client per fetch worker
    PerWorker,
}

/// Run parameters and pipeline timing
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// First page number to fetch (1-based)
    #[serde(rename = "start-page")]
    pub start_page: u32,

    /// Number of consecutive pages to fetch
    #[serde(rename = "page-count")]
    pub page_count: u32,

    /// Size of the fetch worker pool
    #[serde(rename = "fetch-workers")]
    pub fetch_workers: u32,

    /// Size of the parse worker pool
    #[serde(rename = "parse-workers")]
    pub parse_workers: u32,

    /// Bounded wait on every worker dequeue (milliseconds)
    #[serde(rename = "dequeue-timeout-ms", default = "default_dequeue_timeout_ms")]
    pub dequeue_timeout_ms: u64,

    /// Re-check interval while waiting for the intermediate queue to drain (milliseconds)
    #[serde(rename = "drain-check-ms", default = "default_drain_check_ms")]
    pub drain_check_ms: u64,

    /// How long the result queue may stay empty before aggregation gives up (milliseconds)
    #[serde(rename = "aggregation-grace-ms", default = "default_aggregation_grace_ms")]
    pub aggregation_grace_ms: u64,

    /// Upper bound on parse pool shutdown after termination markers are sent (seconds)
    #[serde(rename = "shutdown-timeout-secs", default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// HTTP session sharing between fetch workers
    #[serde(default)]
    pub session: SessionMode,
}

/// CSS selectors locating content units and their fields
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Selects one element per content unit
    #[serde(rename = "article-selector", default = "default_article_selector")]
    pub article_selector: String,

    /// Selects the title inside a unit
    #[serde(rename = "title-selector", default = "default_title_selector")]
    pub title_selector: String,

    /// Selects the body excerpt inside a unit
    #[serde(rename = "body-selector", default = "default_body_selector")]
    pub body_selector: String,

    /// Selects the timestamp inside a unit (optional in the markup)
    #[serde(rename = "timestamp-selector", default = "default_timestamp_selector")]
    pub timestamp_selector: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            article_selector: default_article_selector(),
            title_selector: default_title_selector(),
            body_selector: default_body_selector(),
            timestamp_selector: default_timestamp_selector(),
        }
    }
}

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the output file (created if missing)
    pub directory: String,

    /// Serialization format
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_page_size_param() -> String {
    "pageSize".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_dequeue_timeout_ms() -> u64 {
    250
}

fn default_drain_check_ms() -> u64 {
    50
}

fn default_aggregation_grace_ms() -> u64 {
    2000
}

fn default_shutdown_timeout_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_article_selector() -> String {
    "div.news-headline-list article".to_string()
}

fn default_title_selector() -> String {
    "h3.story-title".to_string()
}

fn default_body_selector() -> String {
    "div.story-content p".to_string()
}

fn default_timestamp_selector() -> String {
    "span.timestamp".to_string()
}
