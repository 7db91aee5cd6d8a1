//! Parse pool: M workers turning payloads into records
//!
//! Worker contract:
//! - `Work` with a payload: extract units, attach records, forward the slot
//! - `Work` without a payload: forward the slot as a degraded page
//! - `Terminate`: re-enqueue the marker for the next idle worker, then exit
//!
//! Extraction failures are logged and recorded on the slot; they never stop
//! the worker and never drop the slot.

use crate::crawler::parser::{ExtractedUnit, Extractor};
use crate::crawler::queue::{Dequeue, PipelineMessage, ResultQueue, WorkQueue};
use crate::state::{PageSlot, Record};
use crate::PipelineError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Per-worker counters returned when a parse worker exits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseWorkerReport {
    pub worker_id: usize,
    pub parsed: u64,
    pub degraded: u64,
    pub records: u64,
}

/// Handle to a running parse pool
pub struct ParsePool {
    workers: JoinSet<ParseWorkerReport>,
    size: usize,
}

impl ParsePool {
    /// Spawns `size` parse workers sharing one extractor
    pub fn spawn(
        size: usize,
        work: WorkQueue,
        results: ResultQueue,
        extractor: Arc<dyn Extractor>,
        dequeue_timeout: Duration,
    ) -> Self {
        let mut workers = JoinSet::new();
        for worker_id in 0..size {
            let work = work.clone();
            let results = results.clone();
            let extractor = Arc::clone(&extractor);
            workers.spawn(async move {
                run_parse_worker(worker_id, work, results, extractor, dequeue_timeout).await
            });
        }

        tracing::debug!("Spawned {} parse workers", size);
        Self { workers, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Waits for every worker to exit, giving up after `timeout`
    ///
    /// Workers still running at the deadline are aborted.
    pub async fn join_within(
        mut self,
        timeout: Duration,
    ) -> Result<Vec<ParseWorkerReport>, PipelineError> {
        let mut reports = Vec::with_capacity(self.size);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.workers.join_next()).await {
                Ok(Some(joined)) => {
                    let report = joined.map_err(|e| PipelineError::WorkerPanicked {
                        stage: "parse",
                        message: e.to_string(),
                    })?;
                    reports.push(report);
                }
                Ok(None) => break,
                Err(_) => {
                    self.workers.abort_all();
                    return Err(PipelineError::ShutdownStalled {
                        timeout_secs: timeout.as_secs(),
                    });
                }
            }
        }
        reports.sort_by_key(|r| r.worker_id);
        Ok(reports)
    }
}

async fn run_parse_worker(
    worker_id: usize,
    work: WorkQueue,
    results: ResultQueue,
    extractor: Arc<dyn Extractor>,
    dequeue_timeout: Duration,
) -> ParseWorkerReport {
    let mut report = ParseWorkerReport {
        worker_id,
        ..Default::default()
    };

    loop {
        let (payload, slot) = match work.recv_timeout(dequeue_timeout).await {
            Dequeue::Item(PipelineMessage::Work { payload, slot }) => (payload, slot),
            Dequeue::Item(PipelineMessage::Terminate) => {
                // Relay so the next idle worker also observes termination
                let _ = work.send(PipelineMessage::Terminate);
                break;
            }
            Dequeue::Idle => continue,
            Dequeue::Closed => break,
        };

        let slot = parse_slot(extractor.as_ref(), payload, slot);
        debug_assert!(
            slot.state().is_terminal(),
            "page {} left the parse stage unresolved",
            slot.index()
        );
        if slot.is_degraded() {
            report.degraded += 1;
        } else {
            report.parsed += 1;
        }
        report.records += slot.records().len() as u64;

        let index = slot.index();
        if results.send(slot).is_err() {
            tracing::error!("Result queue closed; dropping page {}", index);
        }
    }

    tracing::debug!(
        "Parse worker {} exiting: {} parsed, {} degraded",
        worker_id,
        report.parsed,
        report.degraded
    );
    report
}

/// Resolves one slot from its payload
pub fn parse_slot(extractor: &dyn Extractor, payload: Option<String>, mut slot: PageSlot) -> PageSlot {
    let payload = match payload {
        Some(payload) if !payload.trim().is_empty() => payload,
        _ => {
            tracing::warn!("Page {} has no content to parse", slot.index());
            slot.mark_parse_failed(Vec::new());
            return slot;
        }
    };

    match extractor.extract_units(&payload) {
        Ok(units) => {
            tracing::debug!("Page {} yielded {} records", slot.index(), units.len());
            slot.mark_parsed(to_records(&units));
        }
        Err(partial) => {
            tracing::error!("Page {}: {}", slot.index(), partial);
            slot.mark_parse_failed(to_records(&partial.recovered));
        }
    }
    slot
}

fn to_records(units: &[ExtractedUnit]) -> Vec<Record> {
    units
        .iter()
        .map(|unit| Record::new(&unit.title, &unit.body, &unit.timestamp))
        .collect()
}
