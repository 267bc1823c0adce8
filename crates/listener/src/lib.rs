//! Sharded status poller.
//!
//! Trackable items are partitioned into `2^B` shards by the low-order hex
//! of their stable key; each shard is serviced by one worker loop. A worker
//! sweeps its queue on a fixed interval, dispatches due items through a
//! bounded task pool, and re-queues anything the handler reports as not yet
//! terminal. The scheduler owns all timing: handlers report whether to
//! continue, the deadline bookkeeping lives here.

mod backoff;
mod item;

pub use backoff::interval_for_attempt;
pub use item::{Listened, Poll};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ListenerError {
    /// The shard is already tracking its full capacity of items.
    /// Backpressure policy: fail fast and let the caller decide; enqueue
    /// never blocks.
    #[error("shard {shard} is full")]
    ShardFull { shard: usize },

    /// The shard key's hex tail could not be interpreted.
    #[error("unusable shard key {0:?}")]
    BadKey(String),
}

pub type Result<T> = std::result::Result<T, ListenerError>;

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Shard count is `2^shard_bits`.
    pub shard_bits: u32,
    /// Per-shard cap on tracked items (`Q`): resident items, queued or
    /// awaiting their next poll, never exceed this.
    pub queue_capacity: usize,
    /// How often each worker sweeps its queue.
    pub sweep_interval: Duration,
    /// Base unit of the stepped backoff.
    pub base_interval: Duration,
    /// Concurrent `poll` dispatches per shard.
    pub max_concurrency: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            shard_bits: 3,
            queue_capacity: 512,
            sweep_interval: Duration::from_secs(10),
            base_interval: Duration::from_secs(60),
            max_concurrency: 16,
        }
    }
}

struct ListenItem {
    data: Box<dyn Listened>,
    attempts: u32,
    due: Instant,
}

/// Number of hex characters of the key tail used for shard selection.
const KEY_TAIL: usize = 8;

fn shard_index(key: &str, shards: usize) -> Result<usize> {
    let tail = if key.len() > KEY_TAIL {
        &key[key.len() - KEY_TAIL..]
    } else {
        key
    };
    let value =
        u64::from_str_radix(tail, 16).map_err(|_| ListenerError::BadKey(key.to_string()))?;
    Ok((value % shards as u64) as usize)
}

pub struct StatusListener {
    senders: Vec<mpsc::Sender<ListenItem>>,
    /// Items currently tracked per shard, counted from `enqueue` until a
    /// terminal `Done`.
    residents: Vec<Arc<AtomicUsize>>,
    workers: Vec<JoinHandle<()>>,
    config: ListenerConfig,
}

impl StatusListener {
    /// Start `2^B` shard workers and return the listener handle.
    pub fn start(config: ListenerConfig) -> Self {
        let shards = 1usize << config.shard_bits;
        let mut senders = Vec::with_capacity(shards);
        let mut residents = Vec::with_capacity(shards);
        let mut workers = Vec::with_capacity(shards);
        for shard in 0..shards {
            let (tx, rx) = mpsc::channel(config.queue_capacity);
            let count = Arc::new(AtomicUsize::new(0));
            workers.push(tokio::spawn(run_shard(
                shard,
                rx,
                config.clone(),
                count.clone(),
            )));
            senders.push(tx);
            residents.push(count);
        }
        info!(shards, capacity = config.queue_capacity, "status listener started");
        Self {
            senders,
            residents,
            workers,
            config,
        }
    }

    /// Hand an item to its shard. Never blocks; a shard already tracking
    /// its full capacity is reported as `ShardFull`.
    pub fn enqueue(&self, data: Box<dyn Listened>) -> Result<()> {
        let key = data.shard_key();
        let shard = shard_index(&key, self.senders.len())?;
        let count = &self.residents[shard];
        let capacity = self.config.queue_capacity;
        // Reserve a residency slot; released by `dispatch` on `Done`.
        if count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < capacity).then_some(n + 1)
            })
            .is_err()
        {
            return Err(ListenerError::ShardFull { shard });
        }
        let item = ListenItem {
            data,
            attempts: 0,
            due: Instant::now(),
        };
        if self.senders[shard].try_send(item).is_err() {
            count.fetch_sub(1, Ordering::SeqCst);
            return Err(ListenerError::ShardFull { shard });
        }
        debug!(key = %key, shard, "item entered async listening");
        Ok(())
    }

    /// Check a shard key without enqueuing anything.
    pub fn validate_key(&self, key: &str) -> Result<()> {
        shard_index(key, self.senders.len()).map(|_| ())
    }

    pub fn shard_count(&self) -> usize {
        self.senders.len()
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn shutdown(&self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

async fn run_shard(
    shard: usize,
    mut rx: mpsc::Receiver<ListenItem>,
    config: ListenerConfig,
    residents: Arc<AtomicUsize>,
) {
    debug!(shard, "shard worker starting");
    let limiter = Arc::new(Semaphore::new(config.max_concurrency));
    // Completed polls come back through an internal channel so the worker
    // never blocks on its own queue.
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<ListenItem>();
    let mut queue: Vec<ListenItem> = Vec::new();

    loop {
        tokio::time::sleep(config.sweep_interval).await;

        // Ingest new items and finished re-queues.
        loop {
            match rx.try_recv() {
                Ok(item) => queue.push(item),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!(shard, "shard ingress closed, worker exiting");
                    return;
                }
            }
        }
        while let Ok(item) = done_rx.try_recv() {
            queue.push(item);
        }

        // Snapshot pass: only the items present at the start of the sweep.
        let now = Instant::now();
        let mut pending = Vec::with_capacity(queue.len());
        for item in queue.drain(..) {
            if item.due > now {
                pending.push(item);
                continue;
            }
            let limiter = limiter.clone();
            let done_tx = done_tx.clone();
            let base = config.base_interval;
            let residents = residents.clone();
            tokio::spawn(async move {
                let Ok(_permit) = limiter.acquire().await else {
                    return;
                };
                dispatch(item, base, &done_tx, &residents).await;
            });
        }
        queue = pending;
    }
}

async fn dispatch(
    mut item: ListenItem,
    base: Duration,
    done_tx: &mpsc::UnboundedSender<ListenItem>,
    residents: &AtomicUsize,
) {
    let key = item.data.shard_key();
    let attempt = item.attempts;
    match item.data.poll(attempt).await {
        Poll::Done => {
            residents.fetch_sub(1, Ordering::SeqCst);
            debug!(key = %key, attempt, "item exited async listening");
        }
        Poll::Again(after) => {
            let interval = after.unwrap_or_else(|| interval_for_attempt(attempt, base));
            item.attempts = attempt + 1;
            item.due = Instant::now() + interval;
            if attempt > 0 && attempt % 10 == 0 {
                warn!(key = %key, attempt, "item still pending");
            }
            if done_tx.send(item).is_err() {
                residents.fetch_sub(1, Ordering::SeqCst);
                error!(key = %key, "shard worker gone, dropping tracked item");
            }
        }
    }
}
