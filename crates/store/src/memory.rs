//! In-memory record store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::model::{ActivityKind, ActivityRecord, AssetRecord};
use crate::{RecordStore, Result, StoreError};

#[derive(Default)]
pub struct MemStore {
    assets: RwLock<HashMap<String, AssetRecord>>,
    activities: RwLock<Vec<ActivityRecord>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemStore {
    async fn create_asset(&self, asset: AssetRecord) -> Result<()> {
        let mut assets = self.assets.write();
        if assets.contains_key(&asset.content_hash) {
            return Err(StoreError::Duplicate(asset.content_hash));
        }
        assets.insert(asset.content_hash.clone(), asset);
        Ok(())
    }

    async fn get_asset(&self, content_hash: &str) -> Result<AssetRecord> {
        self.assets
            .read()
            .get(content_hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(content_hash.to_string()))
    }

    async fn update_asset(&self, asset: &AssetRecord) -> Result<()> {
        let mut assets = self.assets.write();
        match assets.get_mut(&asset.content_hash) {
            Some(slot) => {
                *slot = asset.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(asset.content_hash.clone())),
        }
    }

    async fn asset_exists(&self, content_hash: &str) -> Result<bool> {
        Ok(self.assets.read().contains_key(content_hash))
    }

    async fn asset_count(&self) -> Result<i64> {
        Ok(self.assets.read().len() as i64)
    }

    async fn delete_asset(&self, content_hash: &str) -> Result<()> {
        match self.assets.write().remove(content_hash) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(content_hash.to_string())),
        }
    }

    async fn bump_views(&self, content_hash: &str) -> Result<i64> {
        let mut assets = self.assets.write();
        match assets.get_mut(content_hash) {
            Some(asset) => {
                asset.views += 1;
                Ok(asset.views)
            }
            None => Err(StoreError::NotFound(content_hash.to_string())),
        }
    }

    async fn create_activity(&self, mut activity: ActivityRecord) -> Result<i64> {
        let mut activities = self.activities.write();
        let id = activities.len() as i64 + 1;
        activity.id = id;
        activities.push(activity);
        Ok(id)
    }

    async fn update_activity(&self, activity: &ActivityRecord) -> Result<()> {
        let mut activities = self.activities.write();
        match activities.iter_mut().find(|a| a.id == activity.id) {
            Some(slot) => {
                *slot = activity.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("activity {}", activity.id))),
        }
    }

    async fn activities_for(&self, content_hash: &str) -> Result<Vec<ActivityRecord>> {
        Ok(self
            .activities
            .read()
            .iter()
            .filter(|a| a.content_hash == content_hash)
            .cloned()
            .collect())
    }

    async fn latest_activity(
        &self,
        content_hash: &str,
        kind: ActivityKind,
    ) -> Result<Option<ActivityRecord>> {
        Ok(self
            .activities
            .read()
            .iter()
            .rev()
            .find(|a| a.content_hash == content_hash && a.kind == kind)
            .cloned())
    }
}
