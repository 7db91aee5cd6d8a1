//! Crawler module for paginated archive retrieval
//!
//! This module contains the two-stage pipeline, including:
//! - Request construction for each page of the range
//! - HTTP fetching through a pool of fetch workers
//! - Record extraction through a pool of parse workers
//! - Shutdown signalling and ordered result aggregation

mod aggregator;
mod coordinator;
mod fetch_pool;
mod fetcher;
mod parse_pool;
mod parser;
mod queue;
mod shutdown;
mod source;

pub use aggregator::{sort_by_index, ResultAggregator};
pub use coordinator::{run_crawl, Coordinator, CrawlOutcome, PipelineTimings};
pub use fetch_pool::{FetchPool, FetchWorkerReport};
pub use fetcher::{build_http_client, FetchResponse, Fetcher, FetcherSet, HttpFetcher};
pub use parse_pool::{parse_slot, ParsePool, ParseWorkerReport};
pub use parser::{ExtractedUnit, Extractor, PartialExtraction, SelectorExtractor};
pub use queue::{Dequeue, PipelineMessage, ResultQueue, SharedQueue, WorkQueue};
pub use shutdown::ShutdownCoordinator;
pub use source::{FetchRequest, FetchTask, RequestTemplate, RunParams, TaskSource};

use crate::config::Config;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build one request per page of the configured range
/// 2. Build the HTTP client(s) for the configured session mode
/// 3. Fetch and parse every page through the worker pools
/// 4. Return the pages in order with a run report
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - Crawl completed; some pages may be degraded
/// * `Err(PagerError)` - Crawl could not run to completion
pub async fn crawl(config: &Config) -> Result<CrawlOutcome> {
    run_crawl(config).await
}
