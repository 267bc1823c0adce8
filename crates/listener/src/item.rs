use std::time::Duration;

use async_trait::async_trait;

/// Outcome of one poll of a tracked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// Keep tracking. `Some(interval)` overrides the scheduler's backoff
    /// for the next deadline; `None` applies the stepped default.
    Again(Option<Duration>),
    /// Terminal: the item is dropped from tracking.
    Done,
}

/// A unit of delayed, polled reconciliation work.
///
/// Handler errors are the implementation's business: log and return
/// `Again` to retry on the item's timer. The scheduler never removes an
/// item because a poll went wrong, only because it reported `Done`.
#[async_trait]
pub trait Listened: Send + 'static {
    /// Stable identifier; its low-order hex selects the shard.
    fn shard_key(&self) -> String;

    async fn poll(&mut self, attempt: u32) -> Poll;
}
