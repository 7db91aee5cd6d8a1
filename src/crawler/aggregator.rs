//! Result aggregation: restores page order
//!
//! No queue in the pipeline preserves order. The aggregator collects every
//! finished slot after the parse pool has been joined, checks that each
//! requested page arrived exactly once, and sorts by page index.

use crate::crawler::queue::{Dequeue, ResultQueue};
use crate::state::PageSlot;
use crate::PipelineError;
use std::collections::HashSet;
use std::time::Duration;

/// Collects and orders the pipeline's output
pub struct ResultAggregator {
    results: ResultQueue,
    start_page: u32,
    page_count: u32,
    grace: Duration,
}

impl ResultAggregator {
    /// Creates an aggregator expecting pages `start_page..start_page + page_count`
    pub fn new(results: ResultQueue, start_page: u32, page_count: u32, grace: Duration) -> Self {
        Self {
            results,
            start_page,
            page_count,
            grace,
        }
    }

    /// Drains the result queue and returns the slots in page order
    ///
    /// Call only after every parse worker has been joined. Draining stops as
    /// soon as every expected page has arrived, or once the queue has stayed
    /// empty for the grace period.
    ///
    /// # Errors
    ///
    /// * `PipelineError::AggregationTimeout` - pages are missing after the grace period
    /// * `PipelineError::DuplicateIndex` - a page arrived twice
    /// * `PipelineError::UnexpectedIndex` - a page outside the requested range arrived
    pub async fn collect(self) -> Result<Vec<PageSlot>, PipelineError> {
        let expected = self.page_count as usize;
        let end_page = self.start_page + self.page_count.saturating_sub(1);
        let mut seen = HashSet::with_capacity(expected);
        let mut slots = Vec::with_capacity(expected);

        while slots.len() < expected {
            let slot = match self.results.recv_timeout(self.grace).await {
                Dequeue::Item(slot) => slot,
                Dequeue::Idle | Dequeue::Closed => {
                    return Err(PipelineError::AggregationTimeout {
                        expected,
                        received: slots.len(),
                        grace_ms: self.grace.as_millis() as u64,
                    });
                }
            };

            let index = slot.index();
            if index < self.start_page || index > end_page {
                return Err(PipelineError::UnexpectedIndex(index));
            }
            if !seen.insert(index) {
                return Err(PipelineError::DuplicateIndex(index));
            }
            slots.push(slot);
        }

        if !self.results.is_empty() {
            tracing::warn!(
                "{} extra results left on the queue after aggregation",
                self.results.len()
            );
        }

        sort_by_index(&mut slots);
        Ok(slots)
    }
}

/// Sorts slots ascending by page index
///
/// Sorting an already-sorted sequence leaves it unchanged.
pub fn sort_by_index(slots: &mut [PageSlot]) {
    slots.sort_by_key(PageSlot::index);
}
