//! Shutdown coordinator: decides when the parse pool may stop
//!
//! The coordinator checks termination first and emptiness second:
//! 1. join every fetch worker (each worker's last enqueue happens before it
//!    returns, so nothing can be enqueued after the join completes)
//! 2. wait until the intermediate queue is observed empty, for at most the
//!    drain timeout (a parse pool that has died never drains it)
//! 3. enqueue exactly one termination marker per parse worker
//!
//! Checking in the other order could let a slow fetch worker enqueue after
//! the emptiness check, behind the markers.

use crate::crawler::fetch_pool::{FetchPool, FetchWorkerReport};
use crate::crawler::queue::{PipelineMessage, WorkQueue};
use crate::PipelineError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Injects termination markers once all fetch work is exhausted and drained
pub struct ShutdownCoordinator {
    work: WorkQueue,
    parse_workers: usize,
    drain_check: Duration,
    drain_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(
        work: WorkQueue,
        parse_workers: usize,
        drain_check: Duration,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            work,
            parse_workers,
            drain_check,
            drain_timeout,
        }
    }

    /// Runs the coordinator on its own task
    pub fn spawn(
        self,
        fetch_pool: FetchPool,
    ) -> JoinHandle<Result<Vec<FetchWorkerReport>, PipelineError>> {
        tokio::spawn(async move { self.run(fetch_pool).await })
    }

    /// Supervises the fetch pool, then signals the parse pool
    ///
    /// Returns the fetch workers' reports.
    pub async fn run(self, fetch_pool: FetchPool) -> Result<Vec<FetchWorkerReport>, PipelineError> {
        let reports = fetch_pool.join().await?;
        tracing::debug!("All {} fetch workers exited", reports.len());

        let deadline = Instant::now() + self.drain_timeout;
        while !self.work.is_empty() {
            if Instant::now() >= deadline {
                tracing::error!(
                    "Intermediate queue still holds {} messages after {:?}",
                    self.work.len(),
                    self.drain_timeout
                );
                return Err(PipelineError::ShutdownStalled {
                    timeout_secs: self.drain_timeout.as_secs(),
                });
            }
            self.work.wait_drained(self.drain_check).await;
        }
        tracing::debug!("Intermediate queue drained");

        for _ in 0..self.parse_workers {
            self.work
                .send(PipelineMessage::Terminate)
                .map_err(|_| PipelineError::QueueClosed("intermediate"))?;
        }
        tracing::debug!("Sent {} termination markers", self.parse_workers);

        Ok(reports)
    }
}
