//! Per-asset mutual exclusion. All state-changing operations against one
//! content hash serialize on its lock; operations on different assets run
//! concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct AssetLockManager {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AssetLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `content_hash`, creating it on first use.
    /// Entries are never reclaimed; the key space is bounded by the asset
    /// table.
    pub async fn acquire(&self, content_hash: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(content_hash.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_serializes() {
        let locks = AssetLockManager::new();
        let guard = locks.acquire("aa").await;
        let blocked = tokio::time::timeout(Duration::from_millis(25), locks.acquire("aa")).await;
        assert!(blocked.is_err());
        drop(guard);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(25), locks.acquire("aa")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn different_keys_are_independent() {
        let locks = AssetLockManager::new();
        let _a = locks.acquire("aa").await;
        let b = tokio::time::timeout(Duration::from_millis(25), locks.acquire("bb")).await;
        assert!(b.is_ok());
    }
}
