//! Off-chain storage status tracking.
//!
//! Each freshly created asset gets one `StorageStatusPoll` item in the
//! status listener. The item queries the storage gateway and feeds the
//! observed state into a `LifecycleSink`; `active` and `cancel` are
//! terminal, anything else keeps the item on the poller's timer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use listener::{Listened, Poll};
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

/// Remote file states reported by the storage gateway.
pub const STATE_PENDING: &str = "pending";
pub const STATE_ACTIVE: &str = "active";
pub const STATE_CANCEL: &str = "cancel";

/// Receives lifecycle transitions observed by the poller. Errors are the
/// sink's business; the poller only distinguishes terminal states.
#[async_trait]
pub trait LifecycleSink: Send + Sync {
    async fn update_lifecycle(&self, content_hash: &str, remote_state: &str);
}

#[derive(Debug, Default, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    ok: FileMeta,
}

#[derive(Debug, Default, Deserialize)]
struct FileMeta {
    #[serde(default)]
    state: String,
}

pub struct StorageStatusPoll {
    content_hash: String,
    base_url: String,
    http: reqwest::Client,
    sink: Arc<dyn LifecycleSink>,
}

impl StorageStatusPoll {
    pub fn new(
        content_hash: String,
        base_url: String,
        http: reqwest::Client,
        sink: Arc<dyn LifecycleSink>,
    ) -> Self {
        Self {
            content_hash,
            base_url,
            http,
            sink,
        }
    }

    async fn query_state(&self) -> anyhow::Result<String> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.content_hash
        );
        let envelope: StatusEnvelope = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.ok.state)
    }
}

#[async_trait]
impl Listened for StorageStatusPoll {
    fn shard_key(&self) -> String {
        self.content_hash.clone()
    }

    async fn poll(&mut self, attempt: u32) -> Poll {
        let state = match self.query_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!(hash = %self.content_hash, attempt, "storage status query failed: {e:#}");
                return Poll::Again(None);
            }
        };
        debug!(hash = %self.content_hash, state = %state, "storage status");
        self.sink.update_lifecycle(&self.content_hash, &state).await;
        if state == STATE_ACTIVE || state == STATE_CANCEL {
            Poll::Done
        } else {
            Poll::Again(None)
        }
    }
}

/// Stand-in for environments without a storage gateway: reports `active`
/// after a short random delay.
pub struct MockStoragePoll {
    content_hash: String,
    sink: Arc<dyn LifecycleSink>,
    delay: Duration,
}

impl MockStoragePoll {
    pub fn new(content_hash: String, sink: Arc<dyn LifecycleSink>) -> Self {
        let delay = Duration::from_secs(rand::thread_rng().gen_range(1..=5));
        Self {
            content_hash,
            sink,
            delay,
        }
    }
}

#[async_trait]
impl Listened for MockStoragePoll {
    fn shard_key(&self) -> String {
        self.content_hash.clone()
    }

    async fn poll(&mut self, attempt: u32) -> Poll {
        if attempt == 0 {
            return Poll::Again(Some(self.delay));
        }
        self.sink
            .update_lifecycle(&self.content_hash, STATE_ACTIVE)
            .await;
        Poll::Done
    }
}
