//! Fetch pool: N workers draining the task queue
//!
//! Each worker takes one task at a time, retrieves it once, and forwards the
//! outcome to the intermediate queue. A failed retrieval still forwards the
//! slot (marked `FetchFailed`, no payload) so every page reaches the parse
//! stage exactly once.
//!
//! A worker's last enqueue completes before its task returns, so joining the
//! pool is proof that all of its work is already on the intermediate queue.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::queue::{Dequeue, PipelineMessage, SharedQueue, WorkQueue};
use crate::crawler::source::FetchTask;
use crate::PipelineError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Per-worker counters returned when a fetch worker exits
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchWorkerReport {
    pub worker_id: usize,
    pub succeeded: u64,
    pub failed: u64,
    pub total_latency: Duration,
}

impl FetchWorkerReport {
    pub fn attempts(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Handle to a running fetch pool
pub struct FetchPool {
    workers: JoinSet<FetchWorkerReport>,
    size: usize,
}

impl FetchPool {
    /// Spawns one fetch worker per fetcher
    ///
    /// The task queue must already hold every task of the run; a worker that
    /// finds it empty exits.
    pub fn spawn(
        fetchers: Vec<Arc<dyn Fetcher>>,
        tasks: SharedQueue<FetchTask>,
        work: WorkQueue,
        dequeue_timeout: Duration,
    ) -> Self {
        let size = fetchers.len();
        let mut workers = JoinSet::new();
        for (worker_id, fetcher) in fetchers.into_iter().enumerate() {
            let tasks = tasks.clone();
            let work = work.clone();
            workers.spawn(async move {
                run_fetch_worker(worker_id, tasks, work, fetcher, dequeue_timeout).await
            });
        }

        tracing::debug!("Spawned {} fetch workers", size);
        Self { workers, size }
    }

    /// Waits for every worker to exit
    pub async fn join(mut self) -> Result<Vec<FetchWorkerReport>, PipelineError> {
        let mut reports = Vec::with_capacity(self.size);
        while let Some(joined) = self.workers.join_next().await {
            let report = joined.map_err(|e| PipelineError::WorkerPanicked {
                stage: "fetch",
                message: e.to_string(),
            })?;
            reports.push(report);
        }
        reports.sort_by_key(|r| r.worker_id);
        Ok(reports)
    }
}

async fn run_fetch_worker(
    worker_id: usize,
    tasks: SharedQueue<FetchTask>,
    work: WorkQueue,
    fetcher: Arc<dyn Fetcher>,
    dequeue_timeout: Duration,
) -> FetchWorkerReport {
    let mut report = FetchWorkerReport {
        worker_id,
        ..Default::default()
    };

    loop {
        // The task queue is filled before any worker starts and never refilled
        if tasks.is_empty() {
            break;
        }

        let task = match tasks.recv_timeout(dequeue_timeout).await {
            Dequeue::Item(task) => task,
            Dequeue::Idle => continue,
            Dequeue::Closed => break,
        };

        let page = task.page();
        let FetchTask { request, mut slot } = task;
        let started = Instant::now();
        let outcome = fetcher.fetch(&request).await;
        let latency = started.elapsed();
        report.total_latency += latency;

        let payload = match outcome {
            Ok(response) => {
                report.succeeded += 1;
                tracing::info!(
                    status = response.status_code,
                    page,
                    latency_ms = latency.as_millis() as u64,
                    "[{}] page {} done, {:.5}s",
                    response.status_code,
                    page,
                    latency.as_secs_f64()
                );
                Some(response.body)
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(page, latency_ms = latency.as_millis() as u64, "Fetch failed: {}", e);
                slot.mark_fetch_failed();
                None
            }
        };

        if work.send(PipelineMessage::Work { payload, slot }).is_err() {
            tracing::error!("Intermediate queue closed; dropping page {}", page);
        }
    }

    tracing::debug!(
        "Fetch worker {} exiting after {} attempts",
        worker_id,
        report.attempts()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchResponse;
    use crate::crawler::source::FetchRequest;
    use crate::state::{PageSlot, SlotState};
    use crate::TransportError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use url::Url;

    /// Fails any URL whose `page` query parameter is listed
    struct ScriptedFetcher {
        failing: Vec<u32>,
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
            let page: u32 = request
                .url
                .query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap_or(0);
            if self.failing.contains(&page) {
                return Err(TransportError::Connect {
                    url: request.url.to_string(),
                    message: "refused".to_string(),
                });
            }
            Ok(FetchResponse {
                status_code: 200,
                body: format!("page {}", page),
            })
        }
    }

    fn task(page: u32) -> FetchTask {
        FetchTask {
            request: FetchRequest {
                method: "GET".to_string(),
                url: Url::parse(&format!("https://example.com/list?page={}", page)).unwrap(),
                headers: BTreeMap::new(),
            },
            slot: PageSlot::new(page),
        }
    }

    async fn drain(work: &WorkQueue) -> Vec<(Option<String>, PageSlot)> {
        let mut out = Vec::new();
        while let Dequeue::Item(message) = work.recv_timeout(Duration::from_millis(20)).await {
            match message {
                PipelineMessage::Work { payload, slot } => out.push((payload, slot)),
                PipelineMessage::Terminate => panic!("fetch workers never send markers"),
            }
        }
        out
    }

    #[tokio::test]
    async fn test_every_task_forwarded_exactly_once() {
        let tasks = SharedQueue::new();
        for page in 1..=50 {
            tasks.send(task(page)).unwrap();
        }
        let work = WorkQueue::new();
        let fetcher: Arc<dyn Fetcher> = Arc::new(ScriptedFetcher { failing: vec![] });

        let pool = FetchPool::spawn(
            vec![fetcher; 8],
            tasks,
            work.clone(),
            Duration::from_millis(20),
        );
        let reports = pool.join().await.unwrap();

        assert_eq!(reports.len(), 8);
        assert_eq!(reports.iter().map(FetchWorkerReport::attempts).sum::<u64>(), 50);
        assert_eq!(work.len(), 50);

        let mut pages: Vec<u32> = drain(&work).await.iter().map(|(_, s)| s.index()).collect();
        pages.sort_unstable();
        assert_eq!(pages, (1..=50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failed_fetch_forwards_degraded_slot() {
        let tasks = SharedQueue::new();
        for page in 1..=3 {
            tasks.send(task(page)).unwrap();
        }
        let work = WorkQueue::new();
        let fetcher: Arc<dyn Fetcher> = Arc::new(ScriptedFetcher { failing: vec![2] });

        let reports = FetchPool::spawn(
            vec![fetcher; 2],
            tasks,
            work.clone(),
            Duration::from_millis(20),
        )
        .join()
        .await
        .unwrap();
        assert_eq!(reports.iter().map(|r| r.failed).sum::<u64>(), 1);

        let mut forwarded = drain(&work).await;
        forwarded.sort_by_key(|(_, slot)| slot.index());

        assert_eq!(forwarded.len(), 3);
        assert_eq!(forwarded[0].0.as_deref(), Some("page 1"));
        assert_eq!(forwarded[1].0, None);
        assert_eq!(forwarded[1].1.state(), SlotState::FetchFailed);
        assert_eq!(forwarded[2].1.state(), SlotState::Pending);
    }

    #[tokio::test]
    async fn test_empty_task_queue_exits_immediately() {
        let tasks = SharedQueue::<FetchTask>::new();
        let work = WorkQueue::new();
        let fetcher: Arc<dyn Fetcher> = Arc::new(ScriptedFetcher { failing: vec![] });

        let reports = tokio::time::timeout(
            Duration::from_secs(1),
            FetchPool::spawn(vec![fetcher; 4], tasks, work.clone(), Duration::from_secs(30))
                .join(),
        )
        .await
        .expect("workers should not wait on an empty queue")
        .unwrap();

        assert!(reports.iter().all(|r| r.attempts() == 0));
        assert!(work.is_empty());
    }
}
