//! Crawler coordinator - main pipeline orchestration logic
//!
//! This module wires the pipeline stages together for one run:
//! - Building fetch tasks for the requested page range
//! - Spawning the fetch and parse pools
//! - Supervising shutdown of both pools
//! - Aggregating the ordered result and the run report

use crate::config::{Config, CrawlConfig};
use crate::crawler::aggregator::ResultAggregator;
use crate::crawler::fetch_pool::FetchPool;
use crate::crawler::fetcher::FetcherSet;
use crate::crawler::parse_pool::ParsePool;
use crate::crawler::parser::{Extractor, SelectorExtractor};
use crate::crawler::queue::{ResultQueue, SharedQueue, WorkQueue};
use crate::crawler::shutdown::ShutdownCoordinator;
use crate::crawler::source::{RunParams, TaskSource};
use crate::output::RunReport;
use crate::state::PageSlot;
use crate::{PipelineError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timing knobs for queue waits and shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTimings {
    /// Bounded wait on every worker dequeue
    pub dequeue_timeout: Duration,
    /// Re-check interval while waiting for the intermediate queue to drain
    pub drain_check: Duration,
    /// How long the result queue may stay empty during aggregation
    pub aggregation_grace: Duration,
    /// Upper bound on parse pool shutdown once fetching is complete
    pub shutdown_timeout: Duration,
}

impl From<&CrawlConfig> for PipelineTimings {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            dequeue_timeout: Duration::from_millis(config.dequeue_timeout_ms),
            drain_check: Duration::from_millis(config.drain_check_ms),
            aggregation_grace: Duration::from_millis(config.aggregation_grace_ms),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }
}

/// Ordered pages plus the report of the run that produced them
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub pages: Vec<PageSlot>,
    pub report: RunReport,
}

/// Main pipeline coordinator structure
pub struct Coordinator {
    source: TaskSource,
    fetchers: FetcherSet,
    extractor: Arc<dyn Extractor>,
    timings: PipelineTimings,
}

impl Coordinator {
    /// Creates a coordinator from its collaborators
    pub fn new(
        source: TaskSource,
        fetchers: FetcherSet,
        extractor: Arc<dyn Extractor>,
        timings: PipelineTimings,
    ) -> Self {
        Self {
            source,
            fetchers,
            extractor,
            timings,
        }
    }

    /// Creates a coordinator using HTTP retrieval and CSS-selector extraction
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(PagerError)` - Invalid configuration or HTTP client setup failure
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = TaskSource::from_config(config)?;
        let fetchers = FetcherSet::http(
            config.crawl.session,
            config.crawl.fetch_workers as usize,
            &config.user_agent,
            &config.crawl,
        )?;
        let extractor = Arc::new(SelectorExtractor::new(&config.extract)?);

        Ok(Self::new(
            source,
            fetchers,
            extractor,
            PipelineTimings::from(&config.crawl),
        ))
    }

    /// Runs the pipeline over one page range
    ///
    /// The run fails only for invalid parameters or coordinator-level faults;
    /// individual page failures show up as degraded slots in the outcome.
    pub async fn run(&self, params: RunParams) -> Result<CrawlOutcome> {
        params.validate()?;
        let tasks = self.source.tasks(params.start_page, params.page_count)?;
        let fetchers = self.fetchers.assign(params.fetch_workers as usize)?;

        tracing::info!(
            "Starting run: pages {}..={} with {} fetch / {} parse workers",
            params.start_page,
            params.end_page(),
            params.fetch_workers,
            params.parse_workers
        );
        let started_at = chrono::Utc::now();
        let started = Instant::now();

        let task_queue = SharedQueue::new();
        for task in tasks {
            task_queue
                .send(task)
                .map_err(|_| PipelineError::QueueClosed("task"))?;
        }
        let work_queue = WorkQueue::new();
        let result_queue = ResultQueue::new();

        let fetch_pool = FetchPool::spawn(
            fetchers,
            task_queue,
            work_queue.clone(),
            self.timings.dequeue_timeout,
        );
        let parse_pool = ParsePool::spawn(
            params.parse_workers as usize,
            work_queue.clone(),
            result_queue.clone(),
            Arc::clone(&self.extractor),
            self.timings.dequeue_timeout,
        );
        let shutdown = ShutdownCoordinator::new(
            work_queue,
            parse_pool.size(),
            self.timings.drain_check,
            self.timings.shutdown_timeout,
        )
        .spawn(fetch_pool);

        let fetch_reports = match shutdown.await {
            Ok(Ok(reports)) => reports,
            Ok(Err(stalled)) => {
                // A parse worker that died is the usual reason the queue never drained
                let cause = match parse_pool.join_within(Duration::ZERO).await {
                    Err(panicked @ PipelineError::WorkerPanicked { .. }) => panicked,
                    _ => stalled,
                };
                return Err(cause.into());
            }
            Err(e) => {
                return Err(PipelineError::WorkerPanicked {
                    stage: "shutdown",
                    message: e.to_string(),
                }
                .into());
            }
        };
        let parse_reports = parse_pool.join_within(self.timings.shutdown_timeout).await?;
        tracing::debug!("All {} parse workers exited", parse_reports.len());

        let pages = ResultAggregator::new(
            result_queue,
            params.start_page,
            params.page_count,
            self.timings.aggregation_grace,
        )
        .collect()
        .await?;

        let report = RunReport::from_run(
            &params,
            &pages,
            &fetch_reports,
            started_at,
            started.elapsed(),
        );
        tracing::info!(
            "Run complete: {} pages ({} parsed, {} degraded), {} records in {:?}",
            report.total_pages,
            report.parsed_pages,
            report.degraded_pages(),
            report.total_records,
            started.elapsed()
        );

        Ok(CrawlOutcome { pages, report })
    }
}

/// Runs the pipeline described by a configuration
///
/// # Example
///
/// ```no_run
/// use archive_pager::config::load_config;
/// use archive_pager::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let outcome = run_crawl(&config).await?;
/// println!("{} pages", outcome.pages.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<CrawlOutcome> {
    let coordinator = Coordinator::from_config(config)?;
    coordinator.run(RunParams::from(&config.crawl)).await
}
