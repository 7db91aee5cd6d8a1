//! Messages and queues connecting the pipeline stages
//!
//! A `SharedQueue` is an unbounded tokio channel whose receiver is shared by a
//! pool of workers. Every dequeue is a bounded wait and is cancellation safe:
//! a wait that times out never swallows an item. Queues are unbounded so a
//! parse worker relaying the termination marker can never block on a full
//! queue after its peers have exited.

use crate::state::PageSlot;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};

/// A message on the intermediate (fetch → parse) queue
#[derive(Debug)]
pub enum PipelineMessage {
    /// A resolved page: the payload is `None` when retrieval failed
    Work {
        payload: Option<String>,
        slot: PageSlot,
    },

    /// No more work will arrive; each receiving worker relays it once before exiting
    Terminate,
}

/// Outcome of a bounded-wait dequeue
#[derive(Debug)]
pub enum Dequeue<T> {
    /// An item was received
    Item(T),
    /// Nothing arrived within the wait window
    Idle,
    /// Every sender is gone and the queue is empty
    Closed,
}

/// Multi-producer, multi-consumer queue with a bounded-wait dequeue
pub struct SharedQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
    depth: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl<T> Clone for SharedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: Arc::clone(&self.rx),
            depth: Arc::clone(&self.depth),
            drained: Arc::clone(&self.drained),
        }
    }
}

impl<T> SharedQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            depth: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
        }
    }

    /// Enqueues an item; fails only if every receiver has been dropped
    pub fn send(&self, item: T) -> Result<(), T> {
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.tx.send(item).map_err(|e| {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            e.0
        })
    }

    /// Receives one item, waiting at most `wait`
    pub async fn recv_timeout(&self, wait: Duration) -> Dequeue<T> {
        let received = tokio::time::timeout(wait, async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        })
        .await;

        match received {
            Ok(Some(item)) => {
                if self.depth.fetch_sub(1, Ordering::SeqCst) == 1 {
                    self.drained.notify_one();
                }
                Dequeue::Item(item)
            }
            Ok(None) => Dequeue::Closed,
            Err(_) => Dequeue::Idle,
        }
    }

    /// Number of items enqueued and not yet dequeued
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for the queue to report drained, or at most `check` before the caller re-checks
    pub async fn wait_drained(&self, check: Duration) {
        let _ = tokio::time::timeout(check, self.drained.notified()).await;
    }
}

impl<T> Default for SharedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Intermediate queue between the fetch and parse pools
pub type WorkQueue = SharedQueue<PipelineMessage>;

/// Result queue between the parse pool and the aggregator
pub type ResultQueue = SharedQueue<PageSlot>;
