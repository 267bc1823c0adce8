//! Record store contract for assets and activities.
//!
//! The service consumes storage through this narrow CRUD trait; relational
//! backends live outside this workspace. `MemStore` is the in-memory
//! implementation used by tests and standalone runs.

mod memory;
pub mod model;

pub use memory::MemStore;
pub use model::{
    ActivityKind, ActivityRecord, ActivityState, AssetRecord, LifecycleStatus, TokenStatus,
    DEFAULT_CHAIN, NULL,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Narrow CRUD contract keyed by the asset's content hash. No multi-row
/// transactional guarantee is assumed; callers sequence compensating
/// writes themselves.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_asset(&self, asset: AssetRecord) -> Result<()>;
    async fn get_asset(&self, content_hash: &str) -> Result<AssetRecord>;
    async fn update_asset(&self, asset: &AssetRecord) -> Result<()>;
    async fn asset_exists(&self, content_hash: &str) -> Result<bool>;
    async fn asset_count(&self) -> Result<i64>;
    /// Remove the asset row outright. Lifecycle-level deletion is a status
    /// change; this is for backends that purge.
    async fn delete_asset(&self, content_hash: &str) -> Result<()>;
    /// Bump the view counter without touching anything else.
    async fn bump_views(&self, content_hash: &str) -> Result<i64>;

    /// Insert an activity row and return its id.
    async fn create_activity(&self, activity: ActivityRecord) -> Result<i64>;
    async fn update_activity(&self, activity: &ActivityRecord) -> Result<()>;
    async fn activities_for(&self, content_hash: &str) -> Result<Vec<ActivityRecord>>;
    /// Latest activity of a given kind for the hash, if any.
    async fn latest_activity(
        &self,
        content_hash: &str,
        kind: ActivityKind,
    ) -> Result<Option<ActivityRecord>>;
}
